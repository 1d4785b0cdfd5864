//! Row handles and row identity.
//!
//! Rows are opaque JSON records shared by handle. Identity across data
//! replacement comes from a configured row key; without one, two rows are the
//! same only if they are the same handle.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, TableError};

// =============================================================================
// Row
// =============================================================================

/// A shared handle to one application record.
///
/// Cloning a `Row` clones the handle, not the record, so clones compare equal
/// under [`Row::ptr_eq`].
#[derive(Clone)]
pub struct Row(Arc<Value>);

impl Row {
    /// Wrap a JSON value in a new row handle.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Returns `true` if both handles point at the same record.
    pub fn ptr_eq(&self, other: &Row) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The underlying record.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Read a (possibly dotted) property path.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        get_value_by_path(&self.0, path)
    }
}

impl Deref for Row {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Row {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row({})", self.0)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Row::new)
    }
}

/// Build rows from a list of JSON values.
pub fn rows_from(values: impl IntoIterator<Item = Value>) -> Vec<Row> {
    values.into_iter().map(Row::new).collect()
}

/// Walk a dotted path through objects and arrays.
///
/// Numeric segments index into arrays. Returns `None` as soon as a segment is
/// missing.
pub fn get_value_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| step(current, segment))
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// JavaScript-style truthiness, used for the lazy marker field.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

// =============================================================================
// RowKey
// =============================================================================

/// A hashable identity value extracted from a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    Null,
    Bool(bool),
    /// Numbers keep their canonical JSON text so they stay hashable.
    Number(String),
    Text(String),
    Composite(Vec<RowKey>),
}

impl RowKey {
    /// Derive a key from a JSON value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.to_string()),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::Composite(items.iter().map(Self::from_value).collect()),
            Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl From<i64> for RowKey {
    fn from(n: i64) -> Self {
        Self::Number(n.to_string())
    }
}

impl From<&str> for RowKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RowKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&Value> for RowKey {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

impl<'de> Deserialize<'de> for RowKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|v| RowKey::from_value(&v))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Composite(parts) => {
                let parts: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(","))
            }
        }
    }
}

// =============================================================================
// Key source and identity
// =============================================================================

/// Extractor closure for row keys.
pub type KeyFn = Arc<dyn Fn(&Value) -> RowKey + Send + Sync>;

/// Where a row's key comes from.
#[derive(Clone)]
pub enum RowKeySource {
    /// A property path such as `"id"` or `"meta.id"`.
    Path(String),
    /// A custom extractor.
    Extractor(KeyFn),
}

impl RowKeySource {
    /// Key by a custom extractor.
    pub fn extractor(f: impl Fn(&Value) -> RowKey + Send + Sync + 'static) -> Self {
        Self::Extractor(Arc::new(f))
    }

    fn resolve(&self, value: &Value) -> Result<RowKey> {
        match self {
            Self::Extractor(f) => Ok(f(value)),
            Self::Path(path) => {
                let segments: Vec<&str> = path.split('.').collect();
                let (last, parents) = segments.split_last().unwrap_or((&"", &[]));
                let mut current = value;
                for segment in parents {
                    current = step(current, segment)
                        .filter(|next| !next.is_null())
                        .ok_or_else(|| TableError::KeyPath {
                            path: path.clone(),
                            segment: (*segment).to_string(),
                        })?;
                }
                Ok(step(current, last).map(RowKey::from_value).unwrap_or(RowKey::Null))
            }
        }
    }
}

impl From<&str> for RowKeySource {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for RowKeySource {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl fmt::Debug for RowKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Extractor(_) => f.write_str("Extractor(..)"),
        }
    }
}

/// An indexed row: the handle plus its position in the source sequence.
#[derive(Debug, Clone)]
pub struct KeyedRow {
    pub row: Row,
    pub index: usize,
}

/// Resolves identity for rows under an optional key source.
#[derive(Debug, Clone, Default)]
pub struct RowIdentity {
    source: Option<RowKeySource>,
}

impl RowIdentity {
    /// Identity under the given key source (`None` = reference equality).
    pub fn new(source: Option<RowKeySource>) -> Self {
        Self { source }
    }

    /// Returns `true` if a row key is configured.
    pub fn has_key(&self) -> bool {
        self.source.is_some()
    }

    /// Fail with [`TableError::MissingRowKey`] unless a key is configured.
    pub fn require(&self, feature: &'static str) -> Result<&RowKeySource> {
        self.source.as_ref().ok_or(TableError::MissingRowKey(feature))
    }

    /// Key for a row. Requires a configured key source.
    pub fn key(&self, row: &Row) -> Result<RowKey> {
        self.key_of(row.value())
    }

    /// Key for a bare JSON value (used when walking nested children).
    pub fn key_of(&self, value: &Value) -> Result<RowKey> {
        self.require("row identity")?.resolve(value)
    }

    /// Key equality when configured, reference equality otherwise.
    pub fn same(&self, a: &Row, b: &Row) -> Result<bool> {
        if a.ptr_eq(b) {
            return Ok(true);
        }
        match &self.source {
            Some(source) => Ok(source.resolve(a.value())? == source.resolve(b.value())?),
            None => Ok(false),
        }
    }

    /// Position of `row` in `rows` under this identity.
    pub fn position(&self, rows: &[Row], row: &Row) -> Result<Option<usize>> {
        match &self.source {
            Some(source) => {
                let key = source.resolve(row.value())?;
                for (i, candidate) in rows.iter().enumerate() {
                    if candidate.ptr_eq(row) || source.resolve(candidate.value())? == key {
                        return Ok(Some(i));
                    }
                }
                Ok(None)
            }
            None => Ok(rows.iter().position(|candidate| candidate.ptr_eq(row))),
        }
    }

    /// Index rows by key for O(1) reconciliation. Later duplicates win.
    pub fn build_key_index(&self, rows: &[Row]) -> Result<HashMap<RowKey, KeyedRow>> {
        let source = self.require("key index")?;
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            index.insert(
                source.resolve(row.value())?,
                KeyedRow {
                    row: row.clone(),
                    index: i,
                },
            );
        }
        Ok(index)
    }
}

/// Flip or force membership of `row` in `rows`. Returns whether `rows` changed.
pub fn toggle_row_status(
    identity: &RowIdentity,
    rows: &mut Vec<Row>,
    row: &Row,
    force: Option<bool>,
) -> Result<bool> {
    let position = identity.position(rows, row)?;
    let target = force.unwrap_or(position.is_none());
    match (position, target) {
        (None, true) => {
            rows.push(row.clone());
            Ok(true)
        }
        (Some(i), false) => {
            rows.remove(i);
            Ok(true)
        }
        _ => Ok(false),
    }
}
