use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::labeling::LabelingError;
use crate::storage::StorageError;
use crate::training::TrainingError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("labeling error: {0}")]
    Labeling(#[from] LabelingError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("training error: {0}")]
    Training(#[from] TrainingError),

    #[error("unknown or already recorded ticket {ticket}")]
    UnknownTicket { ticket: u64 },

    #[error("ticket {ticket} was declined and cannot be recorded as a success")]
    SuccessWithoutChoice { ticket: u64 },

    #[error("challenge driver failed: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
