//! The closed mutation set and its handlers.

use std::collections::BTreeMap;
use std::str::FromStr;

use log::{debug, trace};
use serde::Deserialize;
use serde_json::Value;

use crate::column::{Column, ColumnId, ColumnKind, SortOrder};
use crate::error::{Result, TableError};
use crate::events::{Outbox, SortChange, TableEvent};
use crate::query::SortState;
use crate::row::{Row, RowKey};
use crate::selection::SelectionPolicy;
use crate::tree::LoadOutcome;

use super::TableStore;

/// How a `setData` relates to the previous rows.
///
/// This replaces guessing from collection identity: the caller says whether
/// the rows are a new data set or a refresh of the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataRefresh {
    /// A different data set. Without reserve-selection the selection is cleared.
    #[default]
    Replace,
    /// The same data set, edited. Only rows that disappeared are deselected.
    InPlace,
}

/// Every state change the store accepts.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum Mutation {
    /// Replace the raw rows and reconcile all row-bound state.
    SetData {
        rows: Vec<Row>,
        #[serde(default)]
        refresh: DataRefresh,
    },
    InsertColumn {
        column: Column,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        parent: Option<ColumnId>,
    },
    RemoveColumn {
        column: ColumnId,
        #[serde(default)]
        parent: Option<ColumnId>,
    },
    /// Recompute column partitions (batched structural changes before mount).
    UpdateColumns,
    /// Sort by the leaf column displaying `prop`.
    Sort {
        prop: String,
        #[serde(default)]
        order: Option<SortOrder>,
        #[serde(default)]
        init: bool,
    },
    /// Set the sort state without re-deriving rows.
    UpdateSort {
        #[serde(default)]
        column: Option<ColumnId>,
        #[serde(default)]
        prop: Option<String>,
        #[serde(default)]
        order: Option<SortOrder>,
    },
    /// Re-sort after a sort state change.
    ChangeSortCondition {
        #[serde(default)]
        silent: bool,
        #[serde(default)]
        init: bool,
    },
    ClearSort,
    FilterChange {
        columns: Vec<ColumnId>,
        values: Vec<Value>,
        #[serde(default)]
        silent: bool,
    },
    /// Clear filters of the columns with these keys, or all filters.
    ClearFilter {
        #[serde(default)]
        keys: Option<Vec<String>>,
    },
    /// Re-derive visible rows; `skip_filter` reuses the last filtered rows.
    #[serde(rename_all = "camelCase")]
    ExecQuery {
        #[serde(default)]
        skip_filter: bool,
    },
    ToggleAllSelection,
    /// A user toggled one row's checkbox.
    RowSelectedChanged { row: Row },
    /// Programmatic selection toggle.
    #[serde(rename_all = "camelCase")]
    ToggleRowSelection {
        row: Row,
        #[serde(default)]
        selected: Option<bool>,
        #[serde(default)]
        emit_select: bool,
    },
    ClearSelection,
    SetHoverRow {
        #[serde(default)]
        row: Option<Row>,
    },
    SetCurrentRow {
        #[serde(default)]
        row: Option<Row>,
    },
    SetCurrentRowKey { key: RowKey },
    /// Expand-row toggle, or tree toggle when no expand column exists.
    ToggleRowExpansion {
        row: Row,
        #[serde(default)]
        expanded: Option<bool>,
    },
    /// Expanded keys for both the expand-row feature and the tree.
    SetExpandRowKeys { keys: Vec<RowKey> },
    ToggleTreeExpansion {
        row: Row,
        #[serde(default)]
        expanded: Option<bool>,
    },
    LoadOrToggle { row: Row },
    /// A lazy load finished.
    #[serde(skip_deserializing)]
    ApplyLoad(LoadOutcome),
}

impl Mutation {
    /// Replace the data set.
    pub fn set_data(rows: Vec<Row>) -> Self {
        Self::SetData {
            rows,
            refresh: DataRefresh::Replace,
        }
    }

    /// Refresh the current data set in place.
    pub fn refresh_data(rows: Vec<Row>) -> Self {
        Self::SetData {
            rows,
            refresh: DataRefresh::InPlace,
        }
    }

    pub fn name(&self) -> MutationName {
        match self {
            Self::SetData { .. } => MutationName::SetData,
            Self::InsertColumn { .. } => MutationName::InsertColumn,
            Self::RemoveColumn { .. } => MutationName::RemoveColumn,
            Self::UpdateColumns => MutationName::UpdateColumns,
            Self::Sort { .. } => MutationName::Sort,
            Self::UpdateSort { .. } => MutationName::UpdateSort,
            Self::ChangeSortCondition { .. } => MutationName::ChangeSortCondition,
            Self::ClearSort => MutationName::ClearSort,
            Self::FilterChange { .. } => MutationName::FilterChange,
            Self::ClearFilter { .. } => MutationName::ClearFilter,
            Self::ExecQuery { .. } => MutationName::ExecQuery,
            Self::ToggleAllSelection => MutationName::ToggleAllSelection,
            Self::RowSelectedChanged { .. } => MutationName::RowSelectedChanged,
            Self::ToggleRowSelection { .. } => MutationName::ToggleRowSelection,
            Self::ClearSelection => MutationName::ClearSelection,
            Self::SetHoverRow { .. } => MutationName::SetHoverRow,
            Self::SetCurrentRow { .. } => MutationName::SetCurrentRow,
            Self::SetCurrentRowKey { .. } => MutationName::SetCurrentRowKey,
            Self::ToggleRowExpansion { .. } => MutationName::ToggleRowExpansion,
            Self::SetExpandRowKeys { .. } => MutationName::SetExpandRowKeys,
            Self::ToggleTreeExpansion { .. } => MutationName::ToggleTreeExpansion,
            Self::LoadOrToggle { .. } => MutationName::LoadOrToggle,
            Self::ApplyLoad(_) => MutationName::ApplyLoad,
        }
    }

    /// Decode a named mutation from JSON arguments (an object or null).
    pub fn decode(name: MutationName, args: Value) -> Result<Self> {
        let invalid = |message: String| TableError::InvalidArguments {
            name: name.as_str().to_string(),
            message,
        };
        let mut fields = match args {
            Value::Null => serde_json::Map::new(),
            Value::Object(map) => map,
            other => return Err(invalid(format!("expected an object, got {}", other))),
        };
        fields.insert("name".to_string(), Value::String(name.as_str().to_string()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(e.to_string()))
    }
}

macro_rules! mutation_names {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Names of the mutations, as used by [`TableStore::commit_named`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MutationName {
            $($variant),*
        }

        impl MutationName {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }
        }

        impl FromStr for MutationName {
            type Err = TableError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok(Self::$variant),)*
                    other => Err(TableError::UnknownCommand(other.to_string())),
                }
            }
        }
    };
}

mutation_names! {
    SetData => "setData",
    InsertColumn => "insertColumn",
    RemoveColumn => "removeColumn",
    UpdateColumns => "updateColumns",
    Sort => "sort",
    UpdateSort => "updateSort",
    ChangeSortCondition => "changeSortCondition",
    ClearSort => "clearSort",
    FilterChange => "filterChange",
    ClearFilter => "clearFilter",
    ExecQuery => "execQuery",
    ToggleAllSelection => "toggleAllSelection",
    RowSelectedChanged => "rowSelectedChanged",
    ToggleRowSelection => "toggleRowSelection",
    ClearSelection => "clearSelection",
    SetHoverRow => "setHoverRow",
    SetCurrentRow => "setCurrentRow",
    SetCurrentRowKey => "setCurrentRowKey",
    ToggleRowExpansion => "toggleRowExpansion",
    SetExpandRowKeys => "setExpandRowKeys",
    ToggleTreeExpansion => "toggleTreeExpansion",
    LoadOrToggle => "loadOrToggle",
    ApplyLoad => "applyLoad",
}

// =============================================================================
// Dispatch
// =============================================================================

impl TableStore {
    /// Apply one mutation and its cascade, then deliver notifications.
    pub fn commit(&mut self, mutation: Mutation) -> Result<()> {
        trace!("commit {}", mutation.name().as_str());
        let mut out = Outbox::default();
        self.apply(mutation, &mut out)?;
        out.deliver(self.host.as_ref());
        Ok(())
    }

    /// Dispatch a mutation by name with JSON arguments.
    ///
    /// Unknown names fail before any state is touched.
    pub fn commit_named(&mut self, name: &str, args: Value) -> Result<()> {
        let name = MutationName::from_str(name)?;
        let mutation = Mutation::decode(name, args)?;
        self.commit(mutation)
    }

    fn apply(&mut self, mutation: Mutation, out: &mut Outbox) -> Result<()> {
        match mutation {
            Mutation::SetData { rows, refresh } => self.set_data(rows, refresh, out),
            Mutation::InsertColumn {
                column,
                index,
                parent,
            } => self.insert_column(column, index, parent, out),
            Mutation::RemoveColumn { column, parent } => {
                self.columns.remove(&column, parent.as_ref())?;
                self.after_column_change(out);
                Ok(())
            }
            Mutation::UpdateColumns => {
                self.columns.recompute();
                out.layout(true);
                Ok(())
            }
            Mutation::Sort { prop, order, init } => self.sort(prop, order, init, out),
            Mutation::UpdateSort {
                column,
                prop,
                order,
            } => {
                self.update_sort(column, prop, order);
                Ok(())
            }
            Mutation::ChangeSortCondition { silent, init } => {
                self.change_sort_condition(silent, init, out)
            }
            Mutation::ClearSort => {
                if !self.sort.is_active() {
                    return Ok(());
                }
                self.update_sort(None, None, None);
                self.change_sort_condition(true, false, out)
            }
            Mutation::FilterChange {
                columns,
                values,
                silent,
            } => self.filter_change(columns, values, silent, out),
            Mutation::ClearFilter { keys } => self.clear_filter(keys, out),
            Mutation::ExecQuery { skip_filter } => {
                if skip_filter {
                    self.dirty.sort();
                } else {
                    self.dirty.filter();
                }
                self.refresh(out)
            }
            Mutation::ToggleAllSelection => {
                self.selection.toggle_all(&self.identity, &self.data, out)
            }
            Mutation::RowSelectedChanged { row } => self.toggle_row_selection(row, None, true, out),
            Mutation::ToggleRowSelection {
                row,
                selected,
                emit_select,
            } => self.toggle_row_selection(row, selected, emit_select, out),
            Mutation::ClearSelection => {
                self.selection.clear(out);
                Ok(())
            }
            Mutation::SetHoverRow { row } => {
                self.hover_row = row;
                Ok(())
            }
            Mutation::SetCurrentRow { row } => self.current.update(&self.identity, row, out),
            Mutation::SetCurrentRowKey { key } => {
                self.current.set_by_key(&self.identity, key, &self.data, out)
            }
            Mutation::ToggleRowExpansion { row, expanded } => {
                if self.columns.has_expand_column() {
                    self.expansion.toggle(&self.identity, &row, expanded, out)?;
                } else {
                    self.tree.toggle(&self.identity, &row, expanded, out)?;
                }
                Ok(())
            }
            Mutation::SetExpandRowKeys { keys } => {
                self.expansion.set_by_keys(&self.identity, &keys, &self.data)?;
                self.tree.set_expand_row_keys(keys);
                self.dirty.tree();
                self.refresh(out)
            }
            Mutation::ToggleTreeExpansion { row, expanded } => {
                self.tree.toggle(&self.identity, &row, expanded, out)?;
                Ok(())
            }
            Mutation::LoadOrToggle { row } => {
                self.tree.load_or_toggle(&self.identity, &row, &self.options, out)
            }
            Mutation::ApplyLoad(outcome) => {
                if self.tree.apply_load(&self.identity, outcome, out)? {
                    self.dirty.tree();
                    self.refresh(out)?;
                }
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    fn set_data(&mut self, rows: Vec<Row>, refresh: DataRefresh, out: &mut Outbox) -> Result<()> {
        let reserve = self.selection.is_reserve();
        if reserve {
            self.identity.require("reserve-selection")?;
        }
        let loads = if self.identity.has_key() {
            self.identity.build_key_index(&rows)?;
            Some(self.tree.retained_loads(&self.identity, &rows, &self.options)?)
        } else {
            None
        };

        debug!("set data: {} rows ({:?})", rows.len(), refresh);
        let previous_raw = std::mem::replace(&mut self.raw, rows);
        let previous_loads = loads.map(|loads| self.tree.replace_loads(loads));
        self.dirty.filter();
        if let Err(err) = self.refresh(out) {
            self.raw = previous_raw;
            if let Some(loads) = previous_loads {
                self.tree.replace_loads(loads);
            }
            return Err(err);
        }

        self.current.reconcile(&self.identity, &self.data, out)?;
        self.expansion
            .reconcile(&self.identity, &self.data, self.options.default_expand_all)?;
        let policy = match (reserve, refresh) {
            (true, _) => SelectionPolicy::Reserve,
            (false, DataRefresh::Replace) => SelectionPolicy::Clear,
            (false, DataRefresh::InPlace) => SelectionPolicy::Clean,
        };
        self.selection
            .reconcile(policy, &self.identity, &self.data, out)?;
        self.selection.update_all_selected(&self.identity, &self.data)?;

        out.scroll_refresh();
        Ok(())
    }

    fn insert_column(
        &mut self,
        column: Column,
        index: Option<usize>,
        parent: Option<ColumnId>,
        out: &mut Outbox,
    ) -> Result<()> {
        let selection = (column.kind == ColumnKind::Selection)
            .then(|| (column.selectable.clone(), column.reserve_selection));
        self.columns.insert(column, index, parent.as_ref())?;
        if let Some((selectable, reserve)) = selection {
            self.selection.selectable = selectable;
            self.selection.reserve = reserve;
        }
        self.after_column_change(out);
        Ok(())
    }

    fn after_column_change(&mut self, out: &mut Outbox) {
        if self.ready {
            self.columns.recompute();
            out.layout(false);
        }
    }

    fn sort(
        &mut self,
        prop: String,
        order: Option<SortOrder>,
        init: bool,
        out: &mut Outbox,
    ) -> Result<()> {
        let Some(id) = self.columns.leaf_by_property(&prop).map(|c| c.id.clone()) else {
            debug!("sort: no column displays '{}'", prop);
            return Ok(());
        };
        if let Some(column) = self.columns.column_mut(&id) {
            column.order = order;
        }
        self.update_sort(Some(id), Some(prop), order);
        self.change_sort_condition(false, init, out)
    }

    /// Install a new sort, clearing the previous column's own marker.
    fn update_sort(
        &mut self,
        column: Option<ColumnId>,
        prop: Option<String>,
        order: Option<SortOrder>,
    ) {
        if let Some(previous_id) = self.sort.column.clone()
            && Some(&previous_id) != column.as_ref()
            && let Some(previous) = self.columns.column_mut(&previous_id)
        {
            previous.order = None;
        }
        self.sort = SortState {
            column,
            prop,
            order,
        };
    }

    fn change_sort_condition(&mut self, silent: bool, init: bool, out: &mut Outbox) -> Result<()> {
        let change = SortChange {
            column: self.sort.column.clone(),
            prop: self.sort.prop.clone(),
            order: self.sort.order,
        };
        if self.sort.order.is_none() {
            self.sort.column = None;
            self.sort.prop = None;
        }
        self.dirty.sort();
        self.refresh(out)?;

        if !(silent || init) {
            out.emit(TableEvent::SortChange(change));
        }
        out.scroll_refresh();
        Ok(())
    }

    fn filter_change(
        &mut self,
        columns: Vec<ColumnId>,
        values: Vec<Value>,
        silent: bool,
        out: &mut Outbox,
    ) -> Result<()> {
        let mut keyed = Vec::with_capacity(columns.len());
        for id in columns {
            let column = self
                .columns
                .column(&id)
                .ok_or_else(|| TableError::UnknownColumn(id.to_string()))?;
            keyed.push((column.filter_key(), id));
        }

        let mut changed = BTreeMap::new();
        for (key, id) in keyed {
            self.filters.insert(id, values.clone());
            changed.insert(key, values.clone());
        }
        self.dirty.filter();
        self.refresh(out)?;

        if !silent {
            out.emit(TableEvent::FilterChange(changed));
        }
        out.scroll_refresh();
        Ok(())
    }

    fn clear_filter(&mut self, keys: Option<Vec<String>>, out: &mut Outbox) -> Result<()> {
        match keys {
            Some(keys) => {
                let ids = keys
                    .iter()
                    .filter_map(|key| self.columns.leaf_by_key(key))
                    .map(|c| c.id.clone())
                    .collect();
                self.filter_change(ids, Vec::new(), true, out)
            }
            None => {
                self.filters.clear();
                self.filter_change(Vec::new(), Vec::new(), true, out)
            }
        }
    }

    fn toggle_row_selection(
        &mut self,
        row: Row,
        selected: Option<bool>,
        user_driven: bool,
        out: &mut Outbox,
    ) -> Result<()> {
        self.selection
            .toggle(&self.identity, &row, selected, user_driven, out)?;
        self.selection.update_all_selected(&self.identity, &self.data)
    }
}
