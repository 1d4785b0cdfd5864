//! Column definitions.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::row::Row;

/// Identifier of a column within one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub String);

impl ColumnId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ColumnId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a column renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Default,
    /// Checkbox column driving row selection.
    Selection,
    /// Row number column.
    Index,
    /// Toggle column for the expand-row feature.
    Expand,
}

/// Column pinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fixed {
    #[default]
    None,
    Left,
    Right,
}

impl Fixed {
    pub fn is_fixed(self) -> bool {
        self != Fixed::None
    }
}

impl<'de> Deserialize<'de> for Fixed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // `true` pins left, like a bare `fixed` attribute.
        match Value::deserialize(deserializer)? {
            Value::Bool(true) => Ok(Fixed::Left),
            Value::Null | Value::Bool(false) => Ok(Fixed::None),
            Value::String(s) => match s.as_str() {
                "left" => Ok(Fixed::Left),
                "right" => Ok(Fixed::Right),
                "" | "none" => Ok(Fixed::None),
                other => Err(serde::de::Error::custom(format!("invalid fixed value '{}'", other))),
            },
            other => Err(serde::de::Error::custom(format!("invalid fixed value {}", other))),
        }
    }
}

/// Whether and how a column sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sortable {
    #[default]
    Disabled,
    /// Sorted client-side.
    Enabled,
    /// Sorting is delegated to the data source; rows are never reordered here.
    Custom,
}

impl<'de> Deserialize<'de> for Sortable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(true) => Ok(Sortable::Enabled),
            Value::Null | Value::Bool(false) => Ok(Sortable::Disabled),
            Value::String(s) if s == "custom" => Ok(Sortable::Custom),
            other => Err(serde::de::Error::custom(format!("invalid sortable value {}", other))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

// -----------------------------------------------------------------------------
// Callbacks
// -----------------------------------------------------------------------------

/// Filter predicate `(value, row, column) -> keep`.
#[derive(Clone)]
pub struct FilterMethod(pub Arc<dyn Fn(&Value, &Row, &Column) -> bool + Send + Sync>);

impl FilterMethod {
    pub fn new(f: impl Fn(&Value, &Row, &Column) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

/// Custom row comparator.
#[derive(Clone)]
pub struct SortMethod(pub Arc<dyn Fn(&Row, &Row) -> Ordering + Send + Sync>);

impl SortMethod {
    pub fn new(f: impl Fn(&Row, &Row) -> Ordering + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

/// One sort key: a property path or an extractor `(row, index) -> value`.
#[derive(Clone)]
pub enum SortBy {
    Path(String),
    Extractor(Arc<dyn Fn(&Row, usize) -> Value + Send + Sync>),
}

impl SortBy {
    pub fn extractor(f: impl Fn(&Row, usize) -> Value + Send + Sync + 'static) -> Self {
        Self::Extractor(Arc::new(f))
    }
}

impl<'de> Deserialize<'de> for SortBy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SortBy::Path)
    }
}

/// Selection predicate `(row, index) -> selectable`.
#[derive(Clone)]
pub struct Selectable(pub Arc<dyn Fn(&Row, usize) -> bool + Send + Sync>);

impl Selectable {
    pub fn new(f: impl Fn(&Row, usize) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, row: &Row, index: usize) -> bool {
        (self.0)(row, index)
    }
}

macro_rules! opaque_debug {
    ($($ty:ident),*) => {
        $(impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($ty), "(..)"))
            }
        })*
    };
}

opaque_debug!(FilterMethod, SortMethod, Selectable);

impl fmt::Debug for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Extractor(_) => f.write_str("Extractor(..)"),
        }
    }
}

// =============================================================================
// Column
// =============================================================================

/// Column configuration.
///
/// Columns form a forest: a column with `children` is a header group and
/// only its leaves take part in body rendering, filtering and sorting.
///
/// # Examples
///
/// ```
/// use tablestore::column::{Column, Fixed};
///
/// let columns = vec![
///     Column::selection("sel"),
///     Column::new("name").property("name").sortable(),
///     Column::new("ops").fixed(Fixed::Right),
/// ];
/// assert_eq!(columns.len(), 3);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    /// Key reported in filter-change events (falls back to `id`).
    pub column_key: Option<String>,
    /// Row property this column displays and sorts by.
    pub property: Option<String>,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    pub fixed: Fixed,
    pub children: Option<Vec<Column>>,
    pub sortable: Sortable,
    #[serde(skip)]
    pub sort_method: Option<SortMethod>,
    pub sort_by: Vec<SortBy>,
    /// This column's own sort marker.
    pub order: Option<SortOrder>,
    #[serde(skip)]
    pub filter_method: Option<FilterMethod>,
    #[serde(skip)]
    pub selectable: Option<Selectable>,
    pub reserve_selection: bool,
}

impl Column {
    /// Create a plain column.
    pub fn new(id: impl Into<ColumnId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Create a selection (checkbox) column.
    pub fn selection(id: impl Into<ColumnId>) -> Self {
        Self::new(id).kind(ColumnKind::Selection)
    }

    /// Create an expand-row column.
    pub fn expand(id: impl Into<ColumnId>) -> Self {
        Self::new(id).kind(ColumnKind::Expand)
    }

    /// Create a header group over `children`.
    pub fn group(id: impl Into<ColumnId>, children: Vec<Column>) -> Self {
        Self {
            children: Some(children),
            ..Self::new(id)
        }
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn column_key(mut self, key: impl Into<String>) -> Self {
        self.column_key = Some(key.into());
        self
    }

    pub fn fixed(mut self, fixed: Fixed) -> Self {
        self.fixed = fixed;
        self
    }

    /// Make the column sortable client-side.
    pub fn sortable(mut self) -> Self {
        self.sortable = Sortable::Enabled;
        self
    }

    /// Mark sorting as delegated to the data source.
    pub fn custom_sortable(mut self) -> Self {
        self.sortable = Sortable::Custom;
        self
    }

    pub fn sort_method(mut self, f: impl Fn(&Row, &Row) -> Ordering + Send + Sync + 'static) -> Self {
        self.sort_method = Some(SortMethod::new(f));
        self
    }

    pub fn sort_by(mut self, by: SortBy) -> Self {
        self.sort_by.push(by);
        self
    }

    pub fn filter_method(
        mut self,
        f: impl Fn(&Value, &Row, &Column) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter_method = Some(FilterMethod::new(f));
        self
    }

    pub fn selectable(mut self, f: impl Fn(&Row, usize) -> bool + Send + Sync + 'static) -> Self {
        self.selectable = Some(Selectable::new(f));
        self
    }

    pub fn reserve_selection(mut self) -> Self {
        self.reserve_selection = true;
        self
    }

    /// Returns `true` if this is a header group.
    pub fn is_group(&self) -> bool {
        self.children.is_some()
    }

    /// Key used in filter-change payloads.
    pub fn filter_key(&self) -> String {
        self.column_key.clone().unwrap_or_else(|| self.id.0.clone())
    }
}
