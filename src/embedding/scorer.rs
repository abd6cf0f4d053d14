use std::sync::Arc;

use tracing::debug;

use super::error::EmbeddingError;
use super::prompts::expand_question;
use super::registry::ModelRegistry;
use super::types::CandidateScores;
use crate::challenge::Candidates;
use crate::constants::NUM_CANDIDATES;
use crate::selection::ModelVariant;

/// Turns a question and candidate images into per-candidate probabilities.
#[derive(Debug, Clone)]
pub struct EmbeddingScorer {
    registry: Arc<ModelRegistry>,
}

impl EmbeddingScorer {
    /// Creates a scorer over a shared registry.
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Scores every candidate against the paraphrases of `question` using `variant`.
    pub fn score(
        &self,
        variant: ModelVariant,
        question: &str,
        candidates: &Candidates,
    ) -> Result<CandidateScores, EmbeddingError> {
        let prompts = expand_question(question);
        if prompts.is_empty() {
            return Err(EmbeddingError::EmptyQuestion);
        }

        let model = self.registry.get(variant)?;
        let logits = model.similarity_logits(&prompts, candidates)?;
        let scores = aggregate_logits(&logits)?;

        debug!(
            variant = %variant,
            question,
            paraphrases = prompts.len(),
            scores = ?scores.percentages(),
            "Scored candidates"
        );
        Ok(scores)
    }
}

/// Softmax across candidates for each prompt row, then mean over rows.
pub fn aggregate_logits(logits: &[Vec<f32>]) -> Result<CandidateScores, EmbeddingError> {
    if logits.is_empty() {
        return Err(EmbeddingError::InferenceFailed {
            reason: "model returned no logits".to_string(),
        });
    }

    let mut totals = vec![0.0f32; NUM_CANDIDATES];
    for row in logits {
        if row.len() != NUM_CANDIDATES {
            return Err(EmbeddingError::InferenceFailed {
                reason: format!(
                    "expected {} logits per prompt, got {}",
                    NUM_CANDIDATES,
                    row.len()
                ),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::InferenceFailed {
                reason: "model returned non-finite logits".to_string(),
            });
        }
        for (total, p) in totals.iter_mut().zip(softmax(row)) {
            *total += p;
        }
    }

    let rows = logits.len() as f32;
    let scores = totals.into_iter().map(|t| t / rows).collect();
    Ok(CandidateScores::new(scores)?)
}

fn softmax(row: &[f32]) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = row.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
