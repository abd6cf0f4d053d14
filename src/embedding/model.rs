use crate::challenge::Candidates;

use super::error::EmbeddingError;

/// A text–image model that rates how well each prompt describes each candidate.
///
/// Implementations return raw (pre-softmax) logits shaped `[prompts.len()][candidates.len()]`.
pub trait SimilarityModel: Send + Sync {
    /// Computes the similarity logit of every prompt against every candidate.
    fn similarity_logits(
        &self,
        prompts: &[String],
        candidates: &Candidates,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String {
        "similarity-model".to_string()
    }
}

impl std::fmt::Debug for dyn SimilarityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimilarityModel({})", self.describe())
    }
}
