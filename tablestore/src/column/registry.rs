//! Column forest and its fixed/unfixed partitions.

use log::trace;

use crate::error::{Result, TableError};

use super::item::{Column, ColumnId, ColumnKind, Fixed};

/// Owns the column definition tree and the partitions derived from it.
///
/// Partitions are stored as ids and resolved against the tree on read, so
/// per-column state such as the sort marker has a single owner.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    roots: Vec<Column>,
    fixed: Vec<ColumnId>,
    right_fixed: Vec<ColumnId>,
    origin: Vec<ColumnId>,
    leaves: Vec<ColumnId>,
    fixed_leaf_len: usize,
    leaf_len: usize,
    right_fixed_leaf_len: usize,
    is_complex: bool,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Insert `column` at `index` (or the end) of the root list or of
    /// `parent`'s children.
    pub fn insert(
        &mut self,
        column: Column,
        index: Option<usize>,
        parent: Option<&ColumnId>,
    ) -> Result<()> {
        let list = match parent {
            Some(id) => {
                let parent = self
                    .column_mut(id)
                    .ok_or_else(|| TableError::UnknownColumn(id.to_string()))?;
                parent.children.get_or_insert_with(Vec::new)
            }
            None => &mut self.roots,
        };
        let at = index.map_or(list.len(), |i| i.min(list.len()));
        trace!("insert column '{}' at {}", column.id, at);
        list.insert(at, column);
        Ok(())
    }

    /// Remove a column from the root list or from `parent`'s children.
    pub fn remove(&mut self, id: &ColumnId, parent: Option<&ColumnId>) -> Result<Column> {
        let list = match parent {
            Some(parent_id) => self
                .column_mut(parent_id)
                .ok_or_else(|| TableError::UnknownColumn(parent_id.to_string()))?
                .children
                .as_mut()
                .ok_or_else(|| TableError::UnknownColumn(id.to_string()))?,
            None => &mut self.roots,
        };
        let position = list
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| TableError::UnknownColumn(id.to_string()))?;
        trace!("remove column '{}'", id);
        Ok(list.remove(position))
    }

    /// Recompute partitions after structural changes.
    pub fn recompute(&mut self) {
        // A leading selection column follows the left pin when other columns
        // are pinned left.
        let any_left = self.roots.iter().any(|c| c.fixed == Fixed::Left);
        if any_left
            && let Some(first) = self.roots.first_mut()
            && first.kind == ColumnKind::Selection
            && !first.fixed.is_fixed()
        {
            first.fixed = Fixed::Left;
        }

        let by_fixed = |fixed: Fixed| -> Vec<&Column> {
            self.roots.iter().filter(|c| c.fixed == fixed).collect()
        };
        let fixed = by_fixed(Fixed::Left);
        let unfixed = by_fixed(Fixed::None);
        let right_fixed = by_fixed(Fixed::Right);

        let fixed_leaves = flatten(&fixed);
        let leaves = flatten(&unfixed);
        let right_fixed_leaves = flatten(&right_fixed);

        let ids = |cols: &[&Column]| -> Vec<ColumnId> { cols.iter().map(|c| c.id.clone()).collect() };

        self.fixed_leaf_len = fixed_leaves.len();
        self.leaf_len = leaves.len();
        self.right_fixed_leaf_len = right_fixed_leaves.len();
        self.is_complex = !fixed.is_empty() || !right_fixed.is_empty();

        self.origin = [ids(&fixed), ids(&unfixed), ids(&right_fixed)].concat();
        self.leaves = [
            ids(&fixed_leaves),
            ids(&leaves),
            ids(&right_fixed_leaves),
        ]
        .concat();
        self.fixed = ids(&fixed);
        self.right_fixed = ids(&right_fixed);
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Root columns as configured.
    pub fn roots(&self) -> &[Column] {
        &self.roots
    }

    /// Find a column anywhere in the forest.
    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        find(&self.roots, id)
    }

    pub fn column_mut(&mut self, id: &ColumnId) -> Option<&mut Column> {
        find_mut(&mut self.roots, id)
    }

    /// Leaf column by id.
    pub fn leaf_by_id(&self, id: &ColumnId) -> Option<&Column> {
        self.leaves.iter().find(|leaf| *leaf == id).and_then(|id| self.column(id))
    }

    /// Leaf column by its `column_key`.
    pub fn leaf_by_key(&self, key: &str) -> Option<&Column> {
        self.columns().into_iter().find(|c| c.column_key.as_deref() == Some(key))
    }

    /// Leaf column displaying `property`.
    pub fn leaf_by_property(&self, property: &str) -> Option<&Column> {
        self.columns().into_iter().find(|c| c.property.as_deref() == Some(property))
    }

    // -------------------------------------------------------------------------
    // Partitions
    // -------------------------------------------------------------------------

    fn resolve(&self, ids: &[ColumnId]) -> Vec<&Column> {
        ids.iter().filter_map(|id| self.column(id)).collect()
    }

    /// Leaf columns in body order: fixed-left, unfixed, fixed-right.
    pub fn columns(&self) -> Vec<&Column> {
        self.resolve(&self.leaves)
    }

    /// Root columns in header order.
    pub fn origin_columns(&self) -> Vec<&Column> {
        self.resolve(&self.origin)
    }

    pub fn fixed_columns(&self) -> Vec<&Column> {
        self.resolve(&self.fixed)
    }

    pub fn right_fixed_columns(&self) -> Vec<&Column> {
        self.resolve(&self.right_fixed)
    }

    pub fn fixed_leaf_columns(&self) -> Vec<&Column> {
        self.resolve(&self.leaves[..self.fixed_leaf_len])
    }

    pub fn right_fixed_leaf_columns(&self) -> Vec<&Column> {
        self.resolve(&self.leaves[self.leaves.len() - self.right_fixed_leaf_len..])
    }

    pub fn leaf_columns_len(&self) -> usize {
        self.leaf_len
    }

    pub fn fixed_leaf_columns_len(&self) -> usize {
        self.fixed_leaf_len
    }

    pub fn right_fixed_leaf_columns_len(&self) -> usize {
        self.right_fixed_leaf_len
    }

    /// Returns `true` if any column is pinned.
    pub fn is_complex(&self) -> bool {
        self.is_complex
    }

    /// Returns `true` if any leaf is an expand-row column.
    pub fn has_expand_column(&self) -> bool {
        self.columns().iter().any(|c| c.kind == ColumnKind::Expand)
    }
}

/// Depth-first expansion of groups into their leaves.
fn flatten<'a>(columns: &[&'a Column]) -> Vec<&'a Column> {
    let mut out = Vec::new();
    for column in columns {
        match &column.children {
            Some(children) => {
                let children: Vec<&Column> = children.iter().collect();
                out.extend(flatten(&children));
            }
            None => out.push(column),
        }
    }
    out
}

fn find<'a>(columns: &'a [Column], id: &ColumnId) -> Option<&'a Column> {
    columns.iter().find_map(|c| {
        if &c.id == id {
            Some(c)
        } else {
            c.children.as_deref().and_then(|children| find(children, id))
        }
    })
}

fn find_mut<'a>(columns: &'a mut [Column], id: &ColumnId) -> Option<&'a mut Column> {
    for column in columns.iter_mut() {
        if &column.id == id {
            return Some(column);
        }
        if let Some(found) = column
            .children
            .as_deref_mut()
            .and_then(|children| find_mut(children, id))
        {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(columns: Vec<&Column>) -> Vec<&str> {
        columns.into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_flatten_respects_partitions() {
        let mut registry = ColumnRegistry::new();
        registry.insert(Column::new("A").fixed(Fixed::Left), None, None).unwrap();
        registry
            .insert(
                Column::group("B", vec![Column::new("C"), Column::new("D")]),
                None,
                None,
            )
            .unwrap();
        registry.insert(Column::new("E").fixed(Fixed::Right), None, None).unwrap();
        registry.recompute();

        assert_eq!(ids(registry.columns()), vec!["A", "C", "D", "E"]);
        assert_eq!(ids(registry.origin_columns()), vec!["A", "B", "E"]);
        assert_eq!(registry.fixed_leaf_columns_len(), 1);
        assert_eq!(registry.leaf_columns_len(), 2);
        assert_eq!(registry.right_fixed_leaf_columns_len(), 1);
        assert_eq!(ids(registry.right_fixed_leaf_columns()), vec!["E"]);
        assert!(registry.is_complex());
    }

    #[test]
    fn test_selection_column_promoted_when_left_pins_exist() {
        let mut registry = ColumnRegistry::new();
        registry.insert(Column::selection("sel"), None, None).unwrap();
        registry.insert(Column::new("x"), None, None).unwrap();
        registry.insert(Column::new("y").fixed(Fixed::Left), None, None).unwrap();
        registry.recompute();
        registry.recompute();

        assert_eq!(ids(registry.fixed_columns()), vec!["sel", "y"]);
        assert_eq!(ids(registry.columns()), vec!["sel", "y", "x"]);
    }

    #[test]
    fn test_selection_column_not_promoted_without_left_pins() {
        let mut registry = ColumnRegistry::new();
        registry.insert(Column::selection("sel"), None, None).unwrap();
        registry.insert(Column::new("x").fixed(Fixed::Right), None, None).unwrap();
        registry.recompute();

        assert!(registry.fixed_columns().is_empty());
        assert!(registry.is_complex());
    }

    #[test]
    fn test_insert_into_parent_and_remove() {
        let mut registry = ColumnRegistry::new();
        registry.insert(Column::new("g"), None, None).unwrap();
        registry.insert(Column::new("b"), None, Some(&"g".into())).unwrap();
        registry.insert(Column::new("a"), Some(0), Some(&"g".into())).unwrap();
        registry.recompute();
        assert_eq!(ids(registry.columns()), vec!["a", "b"]);

        registry.remove(&"a".into(), Some(&"g".into())).unwrap();
        registry.recompute();
        assert_eq!(ids(registry.columns()), vec!["b"]);
        assert!(!registry.is_complex());
    }

    #[test]
    fn test_unknown_parent_is_an_error() {
        let mut registry = ColumnRegistry::new();
        let err = registry.insert(Column::new("a"), None, Some(&"nope".into())).unwrap_err();
        assert!(matches!(err, TableError::UnknownColumn(_)));
    }

    #[test]
    fn test_failed_remove_keeps_leaf_parent() {
        let mut registry = ColumnRegistry::new();
        registry.insert(Column::new("a"), None, None).unwrap();
        registry.insert(Column::new("b"), None, None).unwrap();

        let err = registry.remove(&"zzz".into(), Some(&"a".into())).unwrap_err();
        assert!(matches!(err, TableError::UnknownColumn(id) if id == "zzz"));
        assert!(registry.column(&"a".into()).unwrap().children.is_none());
        registry.recompute();
        assert_eq!(ids(registry.columns()), vec!["a", "b"]);
    }
}
