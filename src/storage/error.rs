use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by the attempt store.
pub enum StorageError {
    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempt was not found.
    #[error("attempt not found: {id}")]
    NotFound {
        /// Attempt id.
        id: String,
    },

    /// An attempt with the same id is already stored.
    #[error("attempt already exists: {id}")]
    AlreadyExists {
        /// Attempt id.
        id: String,
    },

    /// Id does not name a partition or contains path separators.
    #[error("invalid attempt id: {id}")]
    InvalidId {
        /// Offending id.
        id: String,
    },

    /// Attempt violates a data-model invariant.
    #[error("invalid attempt {id}: {reason}")]
    InvalidRecord {
        /// Attempt id (empty before one is assigned).
        id: String,
        /// What is wrong.
        reason: String,
    },

    /// Candidate image file is missing or unreadable.
    #[error("candidate {index} of attempt {id} unreadable: {reason}")]
    ImageUnreadable {
        /// Attempt id.
        id: String,
        /// 1-based candidate index.
        index: u8,
        /// Underlying error.
        reason: String,
    },

    /// Store root is missing/unavailable.
    #[error("storage path unavailable: {path}")]
    StorageUnavailable {
        /// Path that was unavailable.
        path: PathBuf,
    },
}

/// Convenience result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;
