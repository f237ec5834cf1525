//! Storage errors.

use evolve_core::SnapshotError;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while saving or restoring state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored record could not be rebuilt
    #[error("Invalid record: {0}")]
    Record(#[from] SnapshotError),
}
