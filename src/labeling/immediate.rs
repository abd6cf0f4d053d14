use tracing::{debug, info};

use crate::challenge::CandidateIndex;
use crate::embedding::EmbeddingScorer;
use crate::scoring::{GateConfig, GateVerdict};
use crate::selection::ModelVariant;
use crate::storage::{Attempt, AttemptStore, LabelSource, LabelUpdate};

use super::error::{LabelingError, LabelingResult};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Model prediction for a stored attempt.
pub struct Prediction {
    /// Highest-scoring candidate.
    pub answer: CandidateIndex,
    /// Best score in percent.
    pub confidence: f32,
    /// Best minus runner-up, in percent.
    pub margin: f32,
    /// Whether the gate passed.
    pub trusted: bool,
}

impl From<GateVerdict> for Prediction {
    fn from(verdict: GateVerdict) -> Self {
        Self {
            answer: verdict.chosen,
            confidence: verdict.confidence,
            margin: verdict.margin,
            trusted: verdict.trusted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// What happened when a failure was offered to the labeler.
pub enum LabelOutcome {
    /// A trusted prediction was written.
    Labeled(Prediction),
    /// Prediction did not pass the gate; nothing written.
    Withheld(Prediction),
    /// Attempt already had a label; nothing written.
    AlreadyLabeled,
}

impl LabelOutcome {
    /// Returns `true` if a label was written.
    pub fn is_labeled(&self) -> bool {
        matches!(self, LabelOutcome::Labeled(_))
    }
}

/// Labels failures from the model's own prediction when the gate trusts it.
#[derive(Debug, Clone)]
pub struct ImmediateLabeler {
    scorer: EmbeddingScorer,
    gate: GateConfig,
    variant: ModelVariant,
}

impl ImmediateLabeler {
    /// Creates a labeler that scores with the baseline variant.
    pub fn new(scorer: EmbeddingScorer, gate: GateConfig) -> Self {
        Self {
            scorer,
            gate,
            variant: ModelVariant::Baseline,
        }
    }

    /// Returns the variant used for predictions.
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Scores a stored attempt from its saved images.
    pub fn predict(&self, store: &AttemptStore, attempt: &Attempt) -> LabelingResult<Prediction> {
        let candidates = store.load_images(&attempt.id)?;
        let scores = self.scorer.score(self.variant, &attempt.question, &candidates)?;
        Ok(GateVerdict::evaluate(&scores, &self.gate).into())
    }

    /// Predicts and, if trusted, labels one failure (first writer wins).
    ///
    /// Does not touch the counters; see [`label_failure`](Self::label_failure).
    pub fn label_without_stats(
        &self,
        store: &AttemptStore,
        attempt: &Attempt,
    ) -> LabelingResult<LabelOutcome> {
        if attempt.succeeded {
            return Err(LabelingError::WrongPartition {
                id: attempt.id.to_string(),
                expected: "failure",
            });
        }
        if attempt.is_labeled() {
            return Ok(LabelOutcome::AlreadyLabeled);
        }

        let prediction = self.predict(store, attempt)?;
        if !prediction.trusted {
            debug!(
                id = %attempt.id,
                confidence = prediction.confidence,
                margin = prediction.margin,
                "Prediction below gate, label withheld"
            );
            return Ok(LabelOutcome::Withheld(prediction));
        }

        let update = LabelUpdate::new(prediction.answer, LabelSource::ImmediateModel)
            .with_confidence(prediction.confidence);
        if !store.update_label(&attempt.id, &update)? {
            return Ok(LabelOutcome::AlreadyLabeled);
        }

        info!(
            id = %attempt.id,
            answer = prediction.answer.get(),
            confidence = prediction.confidence,
            "Failure auto-labeled from model prediction"
        );
        Ok(LabelOutcome::Labeled(prediction))
    }

    /// Labels one failure and bumps the auto-label counters when a label is written.
    pub fn label_failure(
        &self,
        store: &AttemptStore,
        attempt: &Attempt,
    ) -> LabelingResult<LabelOutcome> {
        let outcome = self.label_without_stats(store, attempt)?;
        if outcome.is_labeled() {
            store.update_stats(|stats| stats.record_labels(1, true))?;
        }
        Ok(outcome)
    }
}
