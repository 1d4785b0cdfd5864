//! Column definitions and the column registry.

mod item;
mod registry;

pub use item::{
    Column, ColumnId, ColumnKind, FilterMethod, Fixed, Selectable, SortBy, SortMethod, SortOrder,
    Sortable,
};
pub use registry::ColumnRegistry;
