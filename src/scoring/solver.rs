use tracing::{debug, info, warn};

use crate::challenge::Candidates;
use crate::embedding::{CandidateScores, EmbeddingScorer};
use crate::selection::ModelVariant;

use super::config::SolverConfig;
use super::error::{ScoringError, ScoringResult};
use super::types::{Decision, GateVerdict};

/// Scores one challenge with the active variant and applies the trust gate.
#[derive(Debug, Clone)]
pub struct VerificationSolver {
    scorer: EmbeddingScorer,
    config: SolverConfig,
}

impl VerificationSolver {
    /// Creates a solver.
    pub fn new(scorer: EmbeddingScorer, config: SolverConfig) -> Self {
        Self { scorer, config }
    }

    /// Returns the solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Returns the underlying scorer.
    pub fn scorer(&self) -> &EmbeddingScorer {
        &self.scorer
    }

    /// Solves a challenge; scoring failures become a declined decision instead of an error.
    pub fn solve(&self, active: ModelVariant, question: &str, candidates: &Candidates) -> Decision {
        match self.try_solve(active, question, candidates) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    question,
                    variant = %active,
                    error = %e,
                    "Scoring failed, declining challenge"
                );
                Decision::declined(active)
            }
        }
    }

    /// Solves a challenge, surfacing scoring errors.
    pub fn try_solve(
        &self,
        active: ModelVariant,
        question: &str,
        candidates: &Candidates,
    ) -> ScoringResult<Decision> {
        if question.trim().is_empty() {
            return Err(ScoringError::InvalidInput {
                reason: "question is empty".to_string(),
            });
        }

        let gate = &self.config.gate;
        let primary = self.scorer.score(active, question, candidates);

        let decision = match (active, primary) {
            (ModelVariant::Finetuned, Ok(scores)) if self.config.fallback.enabled => {
                self.with_fallback(question, candidates, scores)
            }
            (ModelVariant::Finetuned, Err(e)) if self.config.fallback.enabled => {
                warn!(error = %e, "Fine-tuned scoring failed, falling back to baseline");
                let scores = self.scorer.score(ModelVariant::Baseline, question, candidates)?;
                Decision::scored(ModelVariant::Baseline, scores, gate)
            }
            (variant, scores) => Decision::scored(variant, scores?, gate),
        };

        info!(
            question,
            chosen = ?decision.chosen.map(|c| c.get()),
            confidence = decision.confidence,
            margin = decision.margin,
            model_used = %decision.model_used,
            trusted = decision.trusted,
            "Challenge solved"
        );
        Ok(decision)
    }

    fn with_fallback(
        &self,
        question: &str,
        candidates: &Candidates,
        finetuned: CandidateScores,
    ) -> Decision {
        let gate = &self.config.gate;
        let verdict = GateVerdict::evaluate(&finetuned, gate);

        if !self.config.fallback.is_weak(verdict.confidence, verdict.margin) {
            return Decision::scored(ModelVariant::Finetuned, finetuned, gate);
        }

        debug!(
            confidence = verdict.confidence,
            margin = verdict.margin,
            "Fine-tuned result is weak, re-checking with baseline"
        );

        match self.scorer.score(ModelVariant::Baseline, question, candidates) {
            Ok(baseline) => {
                let baseline_verdict = GateVerdict::evaluate(&baseline, gate);
                if baseline_verdict.confidence > verdict.confidence {
                    info!(
                        finetuned = verdict.confidence,
                        baseline = baseline_verdict.confidence,
                        "Adopting baseline result"
                    );
                    Decision::scored(ModelVariant::Baseline, baseline, gate)
                } else {
                    Decision::scored(ModelVariant::Finetuned, finetuned, gate)
                }
            }
            Err(e) => {
                warn!(error = %e, "Baseline re-check failed, keeping fine-tuned result");
                Decision::scored(ModelVariant::Finetuned, finetuned, gate)
            }
        }
    }
}
