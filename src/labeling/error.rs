use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum LabelingError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("attempt {id} is not a {expected}")]
    WrongPartition { id: String, expected: &'static str },

    #[error("candidate index {index} outside 1..=4")]
    InvalidIndex { index: u8 },
}

/// Result alias for labeling operations.
pub type LabelingResult<T> = Result<T, LabelingError>;
