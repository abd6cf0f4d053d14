use serde::{Deserialize, Serialize};

use crate::challenge::CandidateIndex;
use crate::constants::RANDOM_BASELINE_PCT;
use crate::embedding::CandidateScores;
use crate::selection::ModelVariant;

use super::config::GateConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Result of applying the confidence gate to a set of scores.
pub struct GateVerdict {
    /// Highest-scoring candidate.
    pub chosen: CandidateIndex,
    /// Best score in percent.
    pub confidence: f32,
    /// Best minus runner-up, in percent.
    pub margin: f32,
    /// Whether the gate passed.
    pub trusted: bool,
}

impl GateVerdict {
    /// Ranks `scores` and checks them against `gate`.
    pub fn evaluate(scores: &CandidateScores, gate: &GateConfig) -> Self {
        let ranked = scores.ranked();
        let (chosen, best) = ranked[0];
        let second = ranked.get(1).map(|(_, s)| *s).unwrap_or(0.0);

        let confidence = best * 100.0;
        let margin = (best - second) * 100.0;
        let trusted = confidence >= RANDOM_BASELINE_PCT + gate.conf_margin_abs
            && margin >= gate.conf_margin_rel;

        Self {
            chosen,
            confidence,
            margin,
            trusted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// What the solver decided for one challenge.
pub struct Decision {
    /// Candidate to submit, or `None` when scoring failed.
    pub chosen: Option<CandidateIndex>,
    /// Best score in percent (0 when declined).
    pub confidence: f32,
    /// Best minus runner-up, in percent (0 when declined).
    pub margin: f32,
    /// Variant whose scores were adopted.
    pub model_used: ModelVariant,
    /// Full score vector, when scoring succeeded.
    pub scores: Option<CandidateScores>,
    /// Whether the confidence gate passed.
    pub trusted: bool,
}

impl Decision {
    /// Builds a decision from scores that passed through the gate.
    pub fn scored(model_used: ModelVariant, scores: CandidateScores, gate: &GateConfig) -> Self {
        let verdict = GateVerdict::evaluate(&scores, gate);
        Self {
            chosen: Some(verdict.chosen),
            confidence: verdict.confidence,
            margin: verdict.margin,
            model_used,
            scores: Some(scores),
            trusted: verdict.trusted,
        }
    }

    /// A decision with no choice (scoring failed).
    pub fn declined(model_used: ModelVariant) -> Self {
        Self {
            chosen: None,
            confidence: 0.0,
            margin: 0.0,
            model_used,
            scores: None,
            trusted: false,
        }
    }

    /// Returns `true` if no candidate was chosen.
    pub fn is_declined(&self) -> bool {
        self.chosen.is_none()
    }

    /// Returns `true` if a candidate was chosen but the gate did not pass.
    pub fn declined_confidently(&self) -> bool {
        self.chosen.is_some() && !self.trusted
    }

    /// Returns a short debug string.
    pub fn debug_status(&self) -> &'static str {
        match (self.chosen, self.trusted) {
            (None, _) => "DECLINED",
            (Some(_), true) => "TRUSTED",
            (Some(_), false) => "UNTRUSTED",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.chosen {
            Some(chosen) => write!(
                f,
                "{} candidate {} ({:.1}%, margin {:.1}%, {})",
                self.debug_status(),
                chosen,
                self.confidence,
                self.margin,
                self.model_used
            ),
            None => write!(f, "DECLINED ({})", self.model_used),
        }
    }
}
