//! Multi-row selection with tri-state select-all.

use log::debug;

use crate::column::Selectable;
use crate::error::Result;
use crate::events::{Outbox, TableEvent};
use crate::row::{Row, RowIdentity, toggle_row_status};

/// How selection survives a data replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// A new data set arrived: drop the whole selection.
    Clear,
    /// The same data set was refreshed: drop rows that disappeared.
    Clean,
    /// Keep every selected key, remapping to the new row handles.
    Reserve,
}

/// Tracks selected rows and the select-all flag.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selection: Vec<Row>,
    is_all_selected: bool,
    pub(crate) reserve: bool,
    pub(crate) select_on_indeterminate: bool,
    pub(crate) selectable: Option<Selectable>,
}

impl SelectionState {
    pub fn new(select_on_indeterminate: bool) -> Self {
        Self {
            select_on_indeterminate,
            ..Default::default()
        }
    }

    /// Snapshot of the selected rows in selection order.
    pub fn rows(&self) -> &[Row] {
        &self.selection
    }

    pub fn is_all_selected(&self) -> bool {
        self.is_all_selected
    }

    pub fn is_reserve(&self) -> bool {
        self.reserve
    }

    pub fn is_selected(&self, identity: &RowIdentity, row: &Row) -> Result<bool> {
        Ok(identity.position(&self.selection, row)?.is_some())
    }

    /// Flip or force one row. User-driven toggles also emit `select`.
    pub(crate) fn toggle(
        &mut self,
        identity: &RowIdentity,
        row: &Row,
        selected: Option<bool>,
        user_driven: bool,
        out: &mut Outbox,
    ) -> Result<bool> {
        let changed = toggle_row_status(identity, &mut self.selection, row, selected)?;
        if changed {
            let selection = self.selection.clone();
            if user_driven {
                out.emit(TableEvent::Select {
                    selection: selection.clone(),
                    row: row.clone(),
                });
            }
            out.emit(TableEvent::SelectionChange { selection });
        }
        Ok(changed)
    }

    /// Tri-state select-all over the visible rows.
    ///
    /// From a partial selection, `select_on_indeterminate` selects every
    /// selectable row; otherwise the partial selection is cleared.
    pub(crate) fn toggle_all(
        &mut self,
        identity: &RowIdentity,
        data: &[Row],
        out: &mut Outbox,
    ) -> Result<()> {
        let value = if self.select_on_indeterminate {
            !self.is_all_selected
        } else {
            !(self.is_all_selected || !self.selection.is_empty())
        };
        self.is_all_selected = value;

        let mut changed = false;
        for (index, row) in data.iter().enumerate() {
            if let Some(selectable) = &self.selectable
                && !selectable.call(row, index)
            {
                continue;
            }
            changed |= toggle_row_status(identity, &mut self.selection, row, Some(value))?;
        }

        if changed {
            out.emit(TableEvent::SelectionChange {
                selection: self.selection.clone(),
            });
        }
        out.emit(TableEvent::SelectAll {
            selection: self.selection.clone(),
        });
        self.update_all_selected(identity, data)
    }

    /// Recompute the select-all flag against `data`.
    pub(crate) fn update_all_selected(&mut self, identity: &RowIdentity, data: &[Row]) -> Result<()> {
        if data.is_empty() {
            self.is_all_selected = false;
            return Ok(());
        }

        let selected_keys = if identity.has_key() {
            Some(identity.build_key_index(&self.selection)?)
        } else {
            None
        };

        let mut all = true;
        let mut selected_count = 0;
        for (index, row) in data.iter().enumerate() {
            let selected = match &selected_keys {
                Some(keys) => keys.contains_key(&identity.key(row)?),
                None => self.selection.iter().any(|s| s.ptr_eq(row)),
            };
            if selected {
                selected_count += 1;
            } else if self.selectable.as_ref().is_none_or(|s| s.call(row, index)) {
                all = false;
                break;
            }
        }

        self.is_all_selected = all && selected_count > 0;
        Ok(())
    }

    /// Drop the whole selection.
    pub(crate) fn clear(&mut self, out: &mut Outbox) {
        self.is_all_selected = false;
        if !self.selection.is_empty() {
            self.selection.clear();
            out.emit(TableEvent::SelectionChange {
                selection: Vec::new(),
            });
        }
    }

    /// Reconcile against a new visible row sequence.
    pub(crate) fn reconcile(
        &mut self,
        policy: SelectionPolicy,
        identity: &RowIdentity,
        data: &[Row],
        out: &mut Outbox,
    ) -> Result<()> {
        match policy {
            SelectionPolicy::Clear => self.clear(out),
            SelectionPolicy::Clean => self.clean(identity, data, out)?,
            SelectionPolicy::Reserve => self.remap_by_key(identity, data)?,
        }
        Ok(())
    }

    fn clean(&mut self, identity: &RowIdentity, data: &[Row], out: &mut Outbox) -> Result<()> {
        let before = self.selection.len();
        if identity.has_key() {
            let present = identity.build_key_index(data)?;
            let mut kept = Vec::with_capacity(before);
            for row in self.selection.drain(..) {
                if present.contains_key(&identity.key(&row)?) {
                    kept.push(row);
                }
            }
            self.selection = kept;
        } else {
            self.selection.retain(|row| data.iter().any(|d| d.ptr_eq(row)));
        }

        if self.selection.len() != before {
            debug!("selection cleaned: {} -> {}", before, self.selection.len());
            out.emit(TableEvent::SelectionChange {
                selection: self.selection.clone(),
            });
        }
        Ok(())
    }

    fn remap_by_key(&mut self, identity: &RowIdentity, data: &[Row]) -> Result<()> {
        identity.require("reserve-selection")?;
        let selected = identity.build_key_index(&self.selection)?;
        for row in data {
            if let Some(info) = selected.get(&identity.key(row)?) {
                self.selection[info.index] = row.clone();
            }
        }
        Ok(())
    }
}
