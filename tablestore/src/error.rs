//! Error types for the table store.

use thiserror::Error;

/// Errors raised by store operations.
///
/// None of these are expected runtime conditions. They surface a
/// misconfigured table (missing row key, bad key path) or a host that broke
/// the loading protocol, and they always propagate to the caller of the
/// operation that triggered them.
#[derive(Debug, Clone, Error)]
pub enum TableError {
    /// An operation needing cross-refresh identity ran without a row key.
    #[error("row key is required for {0}")]
    MissingRowKey(&'static str),

    /// A dotted row-key path could not be traversed.
    #[error("row key path '{path}' cannot be traversed at segment '{segment}'")]
    KeyPath {
        /// The configured key path.
        path: String,
        /// The intermediate segment that could not be traversed.
        segment: String,
    },

    /// A lazy loader or the data set violated the tree loading protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A named mutation outside the closed command set was dispatched.
    #[error("unknown mutation '{0}'")]
    UnknownCommand(String),

    /// A column id did not resolve to a registered column.
    #[error("column '{0}' not found")]
    UnknownColumn(String),

    /// Arguments for a named mutation could not be decoded.
    #[error("invalid arguments for '{name}': {message}")]
    InvalidArguments {
        /// The mutation name.
        name: String,
        /// Decoder message.
        message: String,
    },
}

impl TableError {
    /// Creates a protocol violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    /// Returns `true` for configuration errors (missing or broken row key).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingRowKey(_) | Self::KeyPath { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TableError>;
