//! Asynchronous child loading for lazy tree nodes.
//!
//! The store hands each load a [`LoadCompletion`]. Completing it posts the
//! payload back over a channel; the store applies it later as an ordinary
//! mutation, after checking the load is still wanted.

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::row::{Row, RowKey};

use super::node::TreeNode;

/// One load request for a lazy node.
#[derive(Debug)]
pub struct LoadRequest {
    /// The row whose children are wanted.
    pub row: Row,
    /// Snapshot of the node when the load started.
    pub node: TreeNode,
    /// Handle to report the children with.
    pub completion: LoadCompletion,
}

/// Host-side loader for lazy children.
///
/// Implementations must return promptly; the actual fetch may run anywhere
/// as long as it eventually calls [`LoadCompletion::complete`].
pub trait ChildLoader {
    fn load(&self, request: LoadRequest);
}

impl<F> ChildLoader for F
where
    F: Fn(LoadRequest),
{
    fn load(&self, request: LoadRequest) {
        self(request)
    }
}

/// Completion handle for one in-flight load. `Send`, so it can move into a
/// spawned task.
#[derive(Debug)]
pub struct LoadCompletion {
    key: RowKey,
    ticket: u64,
    token: CancellationToken,
    sender: UnboundedSender<LoadOutcome>,
}

impl LoadCompletion {
    pub(crate) fn new(
        key: RowKey,
        ticket: u64,
        token: CancellationToken,
        sender: UnboundedSender<LoadOutcome>,
    ) -> Self {
        Self {
            key,
            ticket,
            token,
            sender,
        }
    }

    /// Key of the node being loaded.
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    /// Returns `true` once the node has gone away.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that fires when the node goes away.
    pub fn cancellation(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Report the loaded children. The payload must be a JSON array of rows.
    ///
    /// Returns `false` if the load was cancelled or the store is gone.
    pub fn complete(self, payload: Value) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.sender
            .send(LoadOutcome {
                key: self.key,
                ticket: self.ticket,
                payload,
            })
            .is_ok()
    }

    /// Report the loaded children as a list of records.
    pub fn complete_rows(self, rows: Vec<Value>) -> bool {
        self.complete(Value::Array(rows))
    }
}

/// A finished load waiting to be applied.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub(crate) key: RowKey,
    pub(crate) ticket: u64,
    pub(crate) payload: Value,
}

impl LoadOutcome {
    pub fn key(&self) -> &RowKey {
        &self.key
    }
}

/// Store-side record of a load that has not completed.
#[derive(Debug)]
pub(crate) struct InFlight {
    pub row: Row,
    pub ticket: u64,
    pub token: CancellationToken,
}
