//! Table state engine
//!
//! Headless state for a data table widget: rows and their identity, a
//! column tree with fixed partitions, filtering and sorting, selection,
//! current row, row expansion and a lazily loaded tree hierarchy. Every
//! change goes through [`TableStore::commit`]; the host observes the store
//! through [`TableHost`] notifications.

pub mod column;
pub mod config;
pub mod current;
pub mod error;
pub mod events;
pub mod expand;
pub mod query;
pub mod row;
pub mod selection;
pub mod store;
pub mod tree;

pub use config::TableOptions;
pub use error::{Result, TableError};
pub use events::{EventQueue, ExpandState, SortChange, TableEvent, TableHost};
pub use row::{Row, RowKey, RowKeySource, rows_from};
pub use store::{DataRefresh, Mutation, MutationName, TableStore};

pub mod prelude {
    pub use crate::column::{
        Column, ColumnId, ColumnKind, ColumnRegistry, Fixed, SortOrder, Sortable,
    };
    pub use crate::config::TableOptions;
    pub use crate::error::{Result, TableError};
    pub use crate::events::{EventQueue, ExpandState, SortChange, TableEvent, TableHost};
    pub use crate::query::{Filters, SortState};
    pub use crate::row::{Row, RowKey, RowKeySource, rows_from};
    pub use crate::store::{DataRefresh, Mutation, MutationName, TableStore};
    pub use crate::tree::{ChildLoader, LoadCompletion, LoadRequest, TreeNode};
}
