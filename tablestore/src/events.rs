//! Change notifications and the host interface.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::column::{ColumnId, SortOrder};
use crate::row::Row;

/// Payload of an expand-change notification.
#[derive(Debug, Clone)]
pub enum ExpandState {
    /// Expand-row feature: the expanded rows after the change.
    Rows(Vec<Row>),
    /// Tree feature: the node's new expanded flag.
    Expanded(bool),
}

/// Sort-change payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortChange {
    pub column: Option<ColumnId>,
    pub prop: Option<String>,
    pub order: Option<SortOrder>,
}

/// A notification for the rendering layer.
#[derive(Debug, Clone)]
pub enum TableEvent {
    CurrentChange {
        current: Option<Row>,
        previous: Option<Row>,
    },
    SelectionChange {
        selection: Vec<Row>,
    },
    /// A user-driven toggle of one row.
    Select {
        selection: Vec<Row>,
        row: Row,
    },
    SelectAll {
        selection: Vec<Row>,
    },
    ExpandChange {
        row: Row,
        expanded: ExpandState,
    },
    SortChange(SortChange),
    /// Active values keyed by column key (or id).
    FilterChange(BTreeMap<String, Vec<Value>>),
}

impl TableEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CurrentChange { .. } => "current-change",
            Self::SelectionChange { .. } => "selection-change",
            Self::Select { .. } => "select",
            Self::SelectAll { .. } => "select-all",
            Self::ExpandChange { .. } => "expand-change",
            Self::SortChange(_) => "sort-change",
            Self::FilterChange(_) => "filter-change",
        }
    }
}

/// Collaborator interface implemented by the component hosting the store.
pub trait TableHost {
    /// Deliver a notification.
    fn emit(&self, event: TableEvent);

    /// Request a layout pass, optionally after recomputing columns.
    fn schedule_layout(&self, _update_columns: bool) {}

    /// Request a scroll-position refresh after the next render.
    fn schedule_scroll_refresh(&self) {}
}

/// A host that records everything it is asked to do.
///
/// Clones share the same queue, so a renderer can keep one handle and drain
/// events after each mutation.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<QueueInner>>,
}

#[derive(Debug, Default)]
struct QueueInner {
    events: Vec<TableEvent>,
    layouts: usize,
    scroll_refreshes: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all queued events.
    pub fn drain(&self) -> Vec<TableEvent> {
        self.inner
            .lock()
            .map(|mut g| std::mem::take(&mut g.events))
            .unwrap_or_default()
    }

    /// Names of queued events, without draining.
    pub fn names(&self) -> Vec<&'static str> {
        self.inner
            .lock()
            .map(|g| g.events.iter().map(TableEvent::name).collect())
            .unwrap_or_default()
    }

    /// Number of layout passes requested so far.
    pub fn layouts(&self) -> usize {
        self.inner.lock().map(|g| g.layouts).unwrap_or(0)
    }

    /// Number of scroll refreshes requested so far.
    pub fn scroll_refreshes(&self) -> usize {
        self.inner.lock().map(|g| g.scroll_refreshes).unwrap_or(0)
    }
}

impl TableHost for EventQueue {
    fn emit(&self, event: TableEvent) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.events.push(event);
        }
    }

    fn schedule_layout(&self, _update_columns: bool) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.layouts += 1;
        }
    }

    fn schedule_scroll_refresh(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.scroll_refreshes += 1;
        }
    }
}

/// Side effects buffered while a mutation runs.
///
/// Nothing reaches the host until the mutation has fully applied.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    events: Vec<TableEvent>,
    layout: Option<bool>,
    scroll_refresh: bool,
}

impl Outbox {
    pub fn emit(&mut self, event: TableEvent) {
        self.events.push(event);
    }

    pub fn layout(&mut self, update_columns: bool) {
        self.layout = Some(self.layout.unwrap_or(false) || update_columns);
    }

    pub fn scroll_refresh(&mut self) {
        self.scroll_refresh = true;
    }

    /// Hand everything to the host in order.
    pub fn deliver(self, host: &dyn TableHost) {
        for event in self.events {
            host.emit(event);
        }
        if let Some(update_columns) = self.layout {
            host.schedule_layout(update_columns);
        }
        if self.scroll_refresh {
            host.schedule_scroll_refresh();
        }
    }
}
