//! Error types for storage operations.

use crate::types::RowKey;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A row targeted by an update or remove does not exist.
    #[error("row {key} not found in table '{table}'")]
    RowNotFound {
        /// The table searched.
        table: String,
        /// The missing key.
        key: RowKey,
    },

    /// The unit of work is no longer active.
    #[error("unit of work is {state}")]
    UnitNotActive {
        /// The state the unit is in.
        state: &'static str,
    },

    /// The unit of work was created by a different engine.
    #[error("unit of work {unit} does not belong to this engine")]
    ForeignUnit {
        /// The offending unit.
        unit: u64,
    },

    /// The snapshot file is corrupted.
    #[error("snapshot corrupted: {0}")]
    Corrupted(String),

    /// Snapshot encoding failed.
    #[error("snapshot encoding failed: {0}")]
    Encoding(String),
}

impl StorageError {
    /// Creates a row-not-found error.
    pub fn row_not_found(table: impl Into<String>, key: RowKey) -> Self {
        Self::RowNotFound {
            table: table.into(),
            key,
        }
    }
}
