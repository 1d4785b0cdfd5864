//! Tree nodes and hierarchy normalization.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::TableOptions;
use crate::error::{Result, TableError};
use crate::row::{Row, RowIdentity, RowKey, is_truthy};

/// One node of the hierarchy map.
///
/// `expanded` overlays any load state. A lazy node has no children until its
/// first load completes, and `loaded` never goes back to false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    pub children: Vec<RowKey>,
    /// Depth of the row in the nested data; `None` for rows that arrived
    /// through a lazy load.
    pub level: Option<usize>,
    pub expanded: bool,
    pub lazy: bool,
    pub loaded: bool,
    pub loading: bool,
}

/// Shape of one row as found in the data, before UI state is merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Normalized {
    pub children: Vec<RowKey>,
    pub level: usize,
    pub lazy: bool,
}

/// Walk nested rows and record every row that has children or may load them.
///
/// The lazy marker wins over a children array. Rows with an empty or missing
/// children array and no lazy marker are leaves and are not recorded.
pub(crate) fn normalize(
    rows: &[Row],
    identity: &RowIdentity,
    options: &TableOptions,
) -> Result<HashMap<RowKey, Normalized>> {
    let mut walker = Walker {
        identity,
        options,
        out: HashMap::new(),
    };
    for row in rows {
        walker.visit(row.value(), 0)?;
    }
    Ok(walker.out)
}

struct Walker<'a> {
    identity: &'a RowIdentity,
    options: &'a TableOptions,
    out: HashMap<RowKey, Normalized>,
}

impl Walker<'_> {
    fn visit(&mut self, item: &Value, level: usize) -> Result<()> {
        if is_truthy(item.get(&self.options.lazy_column_identifier)) {
            return self.record(item, None, level);
        }
        if let Some(Value::Array(children)) = item.get(&self.options.children_column_name)
            && !children.is_empty()
        {
            self.record(item, Some(children), level)?;
            for child in children {
                self.visit(child, level + 1)?;
            }
        }
        Ok(())
    }

    fn record(&mut self, item: &Value, children: Option<&Vec<Value>>, level: usize) -> Result<()> {
        let key = self.identity.key_of(item)?;
        match children {
            Some(children) => {
                let children = children
                    .iter()
                    .map(|child| self.identity.key_of(child))
                    .collect::<Result<Vec<_>>>()?;
                self.out.insert(
                    key,
                    Normalized {
                        children,
                        level,
                        lazy: false,
                    },
                );
            }
            None if self.options.lazy => {
                self.out.insert(
                    key,
                    Normalized {
                        children: Vec::new(),
                        level,
                        lazy: true,
                    },
                );
            }
            None => {}
        }
        Ok(())
    }
}

/// Child keys per loaded parent, plus empty entries for loaded rows that are
/// themselves lazy.
pub(crate) fn normalize_lazy(
    loaded: &HashMap<RowKey, Vec<Row>>,
    identity: &RowIdentity,
    options: &TableOptions,
) -> Result<HashMap<RowKey, Vec<RowKey>>> {
    let mut out: HashMap<RowKey, Vec<RowKey>> = HashMap::new();
    let mut nested_lazy = Vec::new();
    for (parent, rows) in loaded {
        if rows.is_empty() {
            continue;
        }
        let mut children = Vec::with_capacity(rows.len());
        for row in rows {
            let key = identity.key(row)?;
            if is_truthy(row.get(&options.lazy_column_identifier)) {
                nested_lazy.push(key.clone());
            }
            children.push(key);
        }
        out.insert(parent.clone(), children);
    }
    for key in nested_lazy {
        out.entry(key).or_default();
    }
    Ok(out)
}

/// Merge freshly normalized shape with the previous node map so expansion
/// and load flags survive a data refresh.
pub(crate) fn merge(
    previous: &HashMap<RowKey, TreeNode>,
    nested: HashMap<RowKey, Normalized>,
    lazy_nodes: HashMap<RowKey, Vec<RowKey>>,
    options: &TableOptions,
    expand_row_keys: &[RowKey],
) -> Result<HashMap<RowKey, TreeNode>> {
    let mut merged = HashMap::with_capacity(nested.len());
    if nested.is_empty() {
        return Ok(merged);
    }

    let expanded = |key: &RowKey| {
        previous.get(key).is_some_and(|old| old.expanded)
            || options.default_expand_all
            || expand_row_keys.contains(key)
    };
    let flags = |key: &RowKey| {
        previous
            .get(key)
            .map_or((false, false), |old| (old.loaded, old.loading))
    };

    for (key, shape) in nested {
        let (loaded, loading) = flags(&key);
        let node = TreeNode {
            expanded: expanded(&key),
            children: shape.children,
            level: Some(shape.level),
            lazy: shape.lazy,
            loaded,
            loading,
        };
        merged.insert(key, node);
    }

    let has_lazy_root = merged.values().any(|node| node.lazy);
    if !options.lazy || !has_lazy_root {
        return Ok(merged);
    }

    for (key, children) in lazy_nodes {
        if let Some(node) = merged.get_mut(&key).filter(|node| node.lazy) {
            if !node.children.is_empty() {
                return Err(TableError::protocol(format!(
                    "lazy node {} already has children",
                    key
                )));
            }
            node.children = children;
            continue;
        }
        let (loaded, loading) = flags(&key);
        let node = TreeNode {
            expanded: expanded(&key),
            children,
            level: None,
            lazy: true,
            loaded,
            loading,
        };
        merged.insert(key, node);
    }
    Ok(merged)
}
