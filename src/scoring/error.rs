use thiserror::Error;

use crate::embedding::EmbeddingError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

/// Result alias for solver operations.
pub type ScoringResult<T> = Result<T, ScoringError>;
