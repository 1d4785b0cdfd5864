//! Hierarchical rows with lazily loaded children.
//!
//! - `node.rs` - node type, normalization and merge
//! - `load.rs` - the async load protocol
//! - `state.rs` - the tree state owned by the store

mod load;
mod node;
mod state;

pub use load::{ChildLoader, LoadCompletion, LoadOutcome, LoadRequest};
pub use node::TreeNode;
pub use state::TreeState;
