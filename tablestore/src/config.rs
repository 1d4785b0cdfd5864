//! Table store configuration.

use crate::row::{RowKey, RowKeySource};

/// Per-table behavior switches.
///
/// # Example
///
/// ```
/// use tablestore::TableOptions;
///
/// let options = TableOptions::new()
///     .row_key("id")
///     .lazy()
///     .default_expand_all();
/// assert!(options.lazy);
/// ```
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Source of row identity. Required by reserve-selection, current-row
    /// keys, expand-row keys and every tree operation.
    pub row_key: Option<RowKeySource>,

    /// Expand every row (and every tree node) on each data replacement.
    pub default_expand_all: bool,

    /// From a partial selection, the select-all checkbox selects every row
    /// when true and clears the selection when false.
    ///
    /// Default: true
    pub select_on_indeterminate: bool,

    /// Treat rows carrying the lazy marker as lazily loaded tree nodes.
    pub lazy: bool,

    /// Field marking a row as having children to load.
    ///
    /// Default: `hasChildren`
    pub lazy_column_identifier: String,

    /// Field holding nested child rows.
    ///
    /// Default: `children`
    pub children_column_name: String,

    /// Indentation per tree level, for renderers.
    ///
    /// Default: 16
    pub indent: u16,

    /// Tree nodes expanded up front.
    pub expand_row_keys: Vec<RowKey>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            row_key: None,
            default_expand_all: false,
            select_on_indeterminate: true,
            lazy: false,
            lazy_column_identifier: "hasChildren".to_string(),
            children_column_name: "children".to_string(),
            indent: 16,
            expand_row_keys: Vec::new(),
        }
    }
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row key source (a property path or an extractor).
    pub fn row_key(mut self, source: impl Into<RowKeySource>) -> Self {
        self.row_key = Some(source.into());
        self
    }

    pub fn default_expand_all(mut self) -> Self {
        self.default_expand_all = true;
        self
    }

    pub fn select_on_indeterminate(mut self, value: bool) -> Self {
        self.select_on_indeterminate = value;
        self
    }

    /// Enable lazy tree loading.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn lazy_column_identifier(mut self, field: impl Into<String>) -> Self {
        self.lazy_column_identifier = field.into();
        self
    }

    pub fn children_column_name(mut self, field: impl Into<String>) -> Self {
        self.children_column_name = field.into();
        self
    }

    pub fn indent(mut self, indent: u16) -> Self {
        self.indent = indent;
        self
    }

    pub fn expand_row_keys(mut self, keys: Vec<RowKey>) -> Self {
        self.expand_row_keys = keys;
        self
    }
}
