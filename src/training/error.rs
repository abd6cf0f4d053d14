use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
/// Errors returned while launching or running a training job.
pub enum TrainingError {
    /// The detached training process could not be started.
    #[error("failed to spawn training job: {reason}")]
    SpawnFailed {
        /// Underlying error.
        reason: String,
    },

    /// No labeled attempt with readable images exists.
    #[error("no labeled attempts available for training")]
    EmptyDataset,

    /// Configuration is unusable.
    #[error("invalid training configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// Model, tokenizer or preprocessing failure.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Tensor or optimizer failure.
    #[error("training step failed: {0}")]
    Candle(#[from] candle_core::Error),

    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for training operations.
pub type TrainingResult<T> = Result<T, TrainingError>;
