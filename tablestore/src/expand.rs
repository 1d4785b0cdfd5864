//! Expand-row state (the non-tree "expand" column feature).

use crate::error::Result;
use crate::events::{ExpandState, Outbox, TableEvent};
use crate::row::{Row, RowIdentity, RowKey, toggle_row_status};

/// Rows whose expand panel is open.
#[derive(Debug, Clone, Default)]
pub struct ExpansionState {
    rows: Vec<Row>,
}

impl ExpansionState {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Membership by key when configured, by handle otherwise.
    pub fn is_expanded(&self, identity: &RowIdentity, row: &Row) -> Result<bool> {
        if identity.has_key() {
            let key = identity.key(row)?;
            for expanded in &self.rows {
                if identity.key(expanded)? == key {
                    return Ok(true);
                }
            }
            Ok(false)
        } else {
            Ok(self.rows.iter().any(|r| r.ptr_eq(row)))
        }
    }

    pub(crate) fn toggle(
        &mut self,
        identity: &RowIdentity,
        row: &Row,
        expanded: Option<bool>,
        out: &mut Outbox,
    ) -> Result<bool> {
        let changed = toggle_row_status(identity, &mut self.rows, row, expanded)?;
        if changed {
            out.emit(TableEvent::ExpandChange {
                row: row.clone(),
                expanded: ExpandState::Rows(self.rows.clone()),
            });
            out.layout(false);
        }
        Ok(changed)
    }

    /// Expand exactly the rows in `data` matching `keys`; unknown keys drop out.
    pub(crate) fn set_by_keys(
        &mut self,
        identity: &RowIdentity,
        keys: &[RowKey],
        data: &[Row],
    ) -> Result<()> {
        identity.require("expand-row-keys")?;
        let index = identity.build_key_index(data)?;
        self.rows = keys
            .iter()
            .filter_map(|key| index.get(key).map(|info| info.row.clone()))
            .collect();
        Ok(())
    }

    /// Carry expansion across a data replacement.
    pub(crate) fn reconcile(
        &mut self,
        identity: &RowIdentity,
        data: &[Row],
        default_expand_all: bool,
    ) -> Result<()> {
        if default_expand_all {
            self.rows = data.to_vec();
        } else if identity.has_key() {
            let expanded = identity.build_key_index(&self.rows)?;
            let mut rows = Vec::new();
            for row in data {
                if expanded.contains_key(&identity.key(row)?) {
                    rows.push(row.clone());
                }
            }
            self.rows = rows;
        } else {
            self.rows.clear();
        }
        Ok(())
    }
}
