//! Tree hierarchy state.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, trace, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::config::TableOptions;
use crate::error::{Result, TableError};
use crate::events::{ExpandState, Outbox, TableEvent};
use crate::row::{Row, RowIdentity, RowKey};

use super::load::{ChildLoader, InFlight, LoadCompletion, LoadOutcome, LoadRequest};
use super::node::{TreeNode, merge, normalize, normalize_lazy};

/// Hierarchy map plus the bookkeeping for lazily loaded children.
pub struct TreeState {
    nodes: HashMap<RowKey, TreeNode>,
    /// Rows fetched on demand, by parent key.
    lazy_children: HashMap<RowKey, Vec<Row>>,
    /// Keys expanded explicitly by the host.
    expand_row_keys: Vec<RowKey>,
    in_flight: HashMap<RowKey, InFlight>,
    next_ticket: u64,
    sender: UnboundedSender<LoadOutcome>,
    receiver: UnboundedReceiver<LoadOutcome>,
    loader: Option<Box<dyn ChildLoader>>,
}

impl fmt::Debug for TreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeState")
            .field("nodes", &self.nodes)
            .field("lazy_children", &self.lazy_children)
            .field("expand_row_keys", &self.expand_row_keys)
            .field("in_flight", &self.in_flight.len())
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

impl TreeState {
    pub fn new(expand_row_keys: Vec<RowKey>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            nodes: HashMap::new(),
            lazy_children: HashMap::new(),
            expand_row_keys,
            in_flight: HashMap::new(),
            next_ticket: 0,
            sender,
            receiver,
            loader: None,
        }
    }

    pub(crate) fn set_loader(&mut self, loader: Option<Box<dyn ChildLoader>>) {
        self.loader = loader;
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// The whole hierarchy map.
    pub fn nodes(&self) -> &HashMap<RowKey, TreeNode> {
        &self.nodes
    }

    pub fn node(&self, key: &RowKey) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    /// Children fetched for `key` by a lazy load.
    pub fn loaded_children(&self, key: &RowKey) -> Option<&[Row]> {
        self.lazy_children.get(key).map(Vec::as_slice)
    }

    pub fn expand_row_keys(&self) -> &[RowKey] {
        &self.expand_row_keys
    }

    /// Number of loads waiting for their completion.
    pub fn pending_loads(&self) -> usize {
        self.in_flight.len()
    }

    // -------------------------------------------------------------------------
    // Rebuild
    // -------------------------------------------------------------------------

    /// Renormalize `data` and merge UI state from the previous map.
    ///
    /// Nothing is changed; the result is handed to [`TreeState::install`].
    pub(crate) fn plan(
        &self,
        identity: &RowIdentity,
        data: &[Row],
        options: &TableOptions,
    ) -> Result<HashMap<RowKey, TreeNode>> {
        if !identity.has_key() {
            return Ok(HashMap::new());
        }
        let nested = normalize(data, identity, options)?;
        let lazy_nodes = normalize_lazy(&self.lazy_children, identity, options)?;
        merge(&self.nodes, nested, lazy_nodes, options, &self.expand_row_keys)
    }

    /// Swap in a planned map and cancel loads for nodes that are gone.
    pub(crate) fn install(&mut self, nodes: HashMap<RowKey, TreeNode>, out: &mut Outbox) {
        let nodes_ref = &nodes;
        self.in_flight.retain(|key, load| {
            let keep = nodes_ref.contains_key(key);
            if !keep {
                debug!("cancelling load for removed node {}", key);
                load.token.cancel();
            }
            keep
        });

        trace!("tree rebuilt with {} nodes", nodes.len());
        self.nodes = nodes;
        out.scroll_refresh();
    }

    /// Loaded children still reachable from the lazy roots of `rows`.
    ///
    /// Also resolves the key of every nested row, so a data set that cannot
    /// be keyed fails here.
    pub(crate) fn retained_loads(
        &self,
        identity: &RowIdentity,
        rows: &[Row],
        options: &TableOptions,
    ) -> Result<HashMap<RowKey, Vec<Row>>> {
        let shape = normalize(rows, identity, options)?;
        let mut stack: Vec<RowKey> = shape
            .into_iter()
            .filter(|(_, node)| node.lazy)
            .map(|(key, _)| key)
            .collect();
        let mut reachable: HashSet<RowKey> = stack.iter().cloned().collect();
        let mut kept = HashMap::new();
        while let Some(key) = stack.pop() {
            let Some(children) = self.lazy_children.get(&key) else {
                continue;
            };
            for child in children {
                let child_key = identity.key(child)?;
                if reachable.insert(child_key.clone()) {
                    stack.push(child_key);
                }
            }
            kept.insert(key, children.clone());
        }
        let dropped = self.lazy_children.len() - kept.len();
        if dropped > 0 {
            debug!("dropping {} orphaned lazy loads", dropped);
        }
        Ok(kept)
    }

    /// Replace the loaded children, returning the previous set.
    pub(crate) fn replace_loads(
        &mut self,
        loads: HashMap<RowKey, Vec<Row>>,
    ) -> HashMap<RowKey, Vec<Row>> {
        std::mem::replace(&mut self.lazy_children, loads)
    }

    pub(crate) fn set_expand_row_keys(&mut self, keys: Vec<RowKey>) {
        self.expand_row_keys = keys;
    }

    // -------------------------------------------------------------------------
    // Expansion
    // -------------------------------------------------------------------------

    /// Flip or force a node's expanded flag. Unknown rows are ignored.
    pub(crate) fn toggle(
        &mut self,
        identity: &RowIdentity,
        row: &Row,
        expanded: Option<bool>,
        out: &mut Outbox,
    ) -> Result<bool> {
        identity.require("tree expansion")?;
        let key = identity.key(row)?;
        let Some(node) = self.nodes.get_mut(&key) else {
            return Ok(false);
        };
        let old = node.expanded;
        node.expanded = expanded.unwrap_or(!old);
        let changed = old != node.expanded;
        if changed {
            out.emit(TableEvent::ExpandChange {
                row: row.clone(),
                expanded: ExpandState::Expanded(node.expanded),
            });
        }
        out.scroll_refresh();
        Ok(changed)
    }

    /// Load an unloaded lazy node, or toggle anything else.
    pub(crate) fn load_or_toggle(
        &mut self,
        identity: &RowIdentity,
        row: &Row,
        options: &TableOptions,
        out: &mut Outbox,
    ) -> Result<()> {
        identity.require("tree loading")?;
        let key = identity.key(row)?;
        let unloaded = self.nodes.get(&key).is_some_and(|node| !node.loaded);
        if options.lazy && unloaded {
            self.load(row, key);
        } else {
            self.toggle(identity, row, None, out)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Start loading children for `key`. A node already loading is left alone.
    fn load(&mut self, row: &Row, key: RowKey) {
        let Some(loader) = &self.loader else {
            return;
        };
        let Some(node) = self.nodes.get_mut(&key) else {
            return;
        };
        if node.loaded || node.loading {
            return;
        }
        node.loading = true;

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let token = CancellationToken::new();
        let completion = LoadCompletion::new(key.clone(), ticket, token.clone(), self.sender.clone());
        let request = LoadRequest {
            row: row.clone(),
            node: node.clone(),
            completion,
        };
        self.in_flight.insert(
            key.clone(),
            InFlight {
                row: row.clone(),
                ticket,
                token,
            },
        );
        debug!("loading children for {}", key);
        loader.load(request);
    }

    /// Next finished load, if any, without waiting.
    pub(crate) fn try_next_outcome(&mut self) -> Option<LoadOutcome> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next finished load.
    pub(crate) async fn next_outcome(&mut self) -> Option<LoadOutcome> {
        if self.in_flight.is_empty() {
            return self.receiver.try_recv().ok();
        }
        self.receiver.recv().await
    }

    /// Apply a finished load. Stale or superseded completions are dropped.
    ///
    /// Returns `true` if the node took the children, in which case the caller
    /// must rebuild.
    pub(crate) fn apply_load(
        &mut self,
        identity: &RowIdentity,
        outcome: LoadOutcome,
        out: &mut Outbox,
    ) -> Result<bool> {
        let current = self
            .in_flight
            .get(&outcome.key)
            .is_some_and(|load| load.ticket == outcome.ticket && !load.token.is_cancelled());
        if !current {
            warn!("discarding stale load for {}", outcome.key);
            return Ok(false);
        }
        let serde_json::Value::Array(items) = outcome.payload else {
            return Err(TableError::protocol(format!(
                "children loaded for {} must be an array",
                outcome.key
            )));
        };
        let rows: Vec<Row> = items.into_iter().map(Row::new).collect();
        for row in &rows {
            identity.key(row)?;
        }

        let Some(load) = self.in_flight.remove(&outcome.key) else {
            return Ok(false);
        };
        let Some(node) = self.nodes.get_mut(&outcome.key).filter(|node| !node.loaded) else {
            warn!("node {} vanished or already loaded", outcome.key);
            return Ok(false);
        };
        node.loading = false;
        node.loaded = true;
        node.expanded = true;
        if !rows.is_empty() {
            self.lazy_children.insert(outcome.key.clone(), rows);
        }
        out.emit(TableEvent::ExpandChange {
            row: load.row,
            expanded: ExpandState::Expanded(true),
        });
        Ok(true)
    }
}

impl Drop for TreeState {
    fn drop(&mut self) {
        for load in self.in_flight.values() {
            load.token.cancel();
        }
    }
}
