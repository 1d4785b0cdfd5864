//! The single "current row" pointer.

use log::debug;

use crate::error::Result;
use crate::events::{Outbox, TableEvent};
use crate::row::{Row, RowIdentity, RowKey};

/// Tracks at most one current row.
///
/// A key set before matching data exists is kept as pending and resolved on
/// the next data replacement, once.
#[derive(Debug, Clone, Default)]
pub struct CurrentRowState {
    current: Option<Row>,
    pending_key: Option<RowKey>,
}

impl CurrentRowState {
    pub fn row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    pub fn pending_key(&self) -> Option<&RowKey> {
        self.pending_key.as_ref()
    }

    /// Remember `key` and resolve it against `data` right away.
    pub(crate) fn set_by_key(
        &mut self,
        identity: &RowIdentity,
        key: RowKey,
        data: &[Row],
        out: &mut Outbox,
    ) -> Result<()> {
        identity.require("current-row-key")?;
        self.pending_key = Some(key.clone());
        self.resolve_by_key(identity, &key, data, out)
    }

    /// Point at the row with `key` in `data`, or at nothing.
    pub(crate) fn resolve_by_key(
        &mut self,
        identity: &RowIdentity,
        key: &RowKey,
        data: &[Row],
        out: &mut Outbox,
    ) -> Result<()> {
        let mut found = None;
        if identity.has_key() {
            for row in data {
                if &identity.key(row)? == key {
                    found = Some(row.clone());
                    break;
                }
            }
        }
        self.replace(identity, found, out)
    }

    /// Explicitly set (or clear) the current row. Discards any pending key.
    pub(crate) fn update(
        &mut self,
        identity: &RowIdentity,
        row: Option<Row>,
        out: &mut Outbox,
    ) -> Result<()> {
        self.pending_key = None;
        self.replace(identity, row, out)
    }

    /// Swap the current row, emitting only on an identity change.
    fn replace(&mut self, identity: &RowIdentity, row: Option<Row>, out: &mut Outbox) -> Result<()> {
        let changed = match (&self.current, &row) {
            (None, None) => false,
            (Some(old), Some(new)) => !identity.same(old, new)?,
            _ => true,
        };
        let previous = std::mem::replace(&mut self.current, row);
        if changed {
            out.emit(TableEvent::CurrentChange {
                current: self.current.clone(),
                previous,
            });
        }
        Ok(())
    }

    /// Re-resolve after the visible rows changed.
    pub(crate) fn reconcile(
        &mut self,
        identity: &RowIdentity,
        data: &[Row],
        out: &mut Outbox,
    ) -> Result<()> {
        if let Some(current) = self.current.clone()
            && !data.iter().any(|row| row.ptr_eq(&current))
        {
            if identity.has_key() {
                let key = identity.key(&current)?;
                self.resolve_by_key(identity, &key, data, out)?;
            } else {
                self.replace(identity, None, out)?;
            }
        } else if let Some(key) = self.pending_key.take() {
            debug!("resolving pending current row key {}", key);
            self.resolve_by_key(identity, &key, data, out)?;
        }
        Ok(())
    }
}
