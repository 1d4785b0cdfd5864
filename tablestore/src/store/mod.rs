//! The table store: canonical state, derived views and the command surface.

mod invalidate;
mod mutation;

use log::debug;

use crate::column::ColumnRegistry;
use crate::config::TableOptions;
use crate::current::CurrentRowState;
use crate::error::Result;
use crate::events::{Outbox, TableHost};
use crate::expand::ExpansionState;
use crate::query::{Filters, SortState, apply_filters, apply_sort};
use crate::row::{Row, RowIdentity};
use crate::selection::SelectionState;
use crate::tree::{ChildLoader, TreeNode, TreeState};

use invalidate::Invalidation;

pub use mutation::{DataRefresh, Mutation, MutationName};

/// State engine behind one table widget.
///
/// All changes go through [`TableStore::commit`]. Each mutation re-derives
/// exactly the views depending on what it touched, then hands buffered
/// notifications to the host. A failing mutation delivers nothing.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tablestore::{EventQueue, Mutation, TableOptions, TableStore, rows_from};
///
/// let events = EventQueue::new();
/// let mut store = TableStore::new(TableOptions::new().row_key("id"), events.clone());
/// store.commit(Mutation::set_data(rows_from(vec![json!({"id": 1}), json!({"id": 2})]))).unwrap();
/// assert_eq!(store.data().len(), 2);
/// ```
pub struct TableStore {
    options: TableOptions,
    identity: RowIdentity,
    host: Box<dyn TableHost>,
    ready: bool,

    columns: ColumnRegistry,

    raw: Vec<Row>,
    filtered: Vec<Row>,
    data: Vec<Row>,
    filters: Filters,
    sort: SortState,
    dirty: Invalidation,

    hover_row: Option<Row>,
    selection: SelectionState,
    current: CurrentRowState,
    expansion: ExpansionState,
    tree: TreeState,
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("options", &self.options)
            .field("ready", &self.ready)
            .field("rows", &self.raw.len())
            .field("visible", &self.data.len())
            .field("sort", &self.sort)
            .field("tree", &self.tree)
            .finish()
    }
}

impl TableStore {
    /// Create a store for one table.
    pub fn new(options: TableOptions, host: impl TableHost + 'static) -> Self {
        let identity = RowIdentity::new(options.row_key.clone());
        let selection = SelectionState::new(options.select_on_indeterminate);
        let tree = TreeState::new(options.expand_row_keys.clone());
        Self {
            options,
            identity,
            host: Box::new(host),
            ready: false,
            columns: ColumnRegistry::new(),
            raw: Vec::new(),
            filtered: Vec::new(),
            data: Vec::new(),
            filters: Filters::new(),
            sort: SortState::default(),
            dirty: Invalidation::default(),
            hover_row: None,
            selection,
            current: CurrentRowState::default(),
            expansion: ExpansionState::default(),
            tree,
        }
    }

    /// Attach the loader used for lazy tree nodes.
    pub fn with_loader(mut self, loader: impl ChildLoader + 'static) -> Self {
        self.tree.set_loader(Some(Box::new(loader)));
        self
    }

    pub fn set_loader(&mut self, loader: Option<Box<dyn ChildLoader>>) {
        self.tree.set_loader(loader);
    }

    /// Mark the table as mounted. From now on column changes recompute
    /// partitions and schedule layout immediately.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    /// Re-derive dirty views in dependency order.
    ///
    /// Views are computed first and swapped in together, so a failure leaves
    /// every view as it was.
    fn refresh(&mut self, out: &mut Outbox) -> Result<()> {
        let dirty = self.dirty.take();
        let filtered = dirty
            .needs_filter()
            .then(|| apply_filters(&self.raw, &self.filters, &self.columns));
        let data = dirty.needs_sort().then(|| {
            let filtered = filtered.as_deref().unwrap_or(&self.filtered);
            apply_sort(filtered, &self.sort, &self.columns)
        });
        let nodes = if dirty.needs_tree() {
            let data = data.as_deref().unwrap_or(&self.data);
            Some(self.tree.plan(&self.identity, data, &self.options)?)
        } else {
            None
        };

        if let Some(filtered) = filtered {
            self.filtered = filtered;
        }
        if let Some(data) = data {
            debug!("visible rows: {} of {}", data.len(), self.raw.len());
            self.data = data;
        }
        if let Some(nodes) = nodes {
            self.tree.install(nodes, out);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Visible rows: raw rows, filtered then sorted.
    pub fn data(&self) -> &[Row] {
        &self.data
    }

    /// Rows as last supplied by the host.
    pub fn raw_data(&self) -> &[Row] {
        &self.raw
    }

    /// Rows after filtering, before sorting.
    pub fn filtered_data(&self) -> &[Row] {
        &self.filtered
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn identity(&self) -> &RowIdentity {
        &self.identity
    }

    pub fn selection(&self) -> &[Row] {
        self.selection.rows()
    }

    pub fn is_selected(&self, row: &Row) -> Result<bool> {
        self.selection.is_selected(&self.identity, row)
    }

    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected()
    }

    pub fn current_row(&self) -> Option<&Row> {
        self.current.row()
    }

    pub fn hover_row(&self) -> Option<&Row> {
        self.hover_row.as_ref()
    }

    /// Rows open under the expand-row feature.
    pub fn expanded_rows(&self) -> &[Row] {
        self.expansion.rows()
    }

    pub fn is_row_expanded(&self, row: &Row) -> Result<bool> {
        self.expansion.is_expanded(&self.identity, row)
    }

    pub fn tree(&self) -> &TreeState {
        &self.tree
    }

    /// Tree node for `row`, if the row is part of the hierarchy.
    pub fn tree_node(&self, row: &Row) -> Result<Option<&TreeNode>> {
        self.identity.require("tree lookup")?;
        Ok(self.tree.node(&self.identity.key(row)?))
    }

    // -------------------------------------------------------------------------
    // Lazy loads
    // -------------------------------------------------------------------------

    /// Apply every load that has completed so far. Returns how many
    /// completions were processed.
    pub fn poll_loads(&mut self) -> Result<usize> {
        let mut processed = 0;
        while let Some(outcome) = self.tree.try_next_outcome() {
            self.commit(Mutation::ApplyLoad(outcome))?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Wait for the next load to complete and apply it.
    ///
    /// Returns `false` immediately when nothing is in flight.
    pub async fn next_load(&mut self) -> Result<bool> {
        match self.tree.next_outcome().await {
            Some(outcome) => {
                self.commit(Mutation::ApplyLoad(outcome))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
