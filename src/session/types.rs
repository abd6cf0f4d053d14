use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::challenge::CandidateIndex;
use crate::labeling::LabelOutcome;
use crate::scoring::{Decision, SolverConfig};
use crate::selection::{ModelVariant, SelectionConfig, SelectionEvent};
use crate::storage::Attempt;
use crate::training::{TriggerConfig, TriggerDecision};

#[derive(Debug, Clone, Default)]
/// Tunables for a [`LearningSession`](super::LearningSession).
pub struct SessionConfig {
    /// Gate and fallback thresholds.
    pub solver: SolverConfig,
    /// Variant switching.
    pub selection: SelectionConfig,
    /// Retraining launch conditions.
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, PartialEq)]
/// Handed back by [`solve_and_record`](super::LearningSession::solve_and_record).
pub struct SolveTicket {
    /// Pass to [`record_outcome`](super::LearningSession::record_outcome).
    pub ticket: u64,
    /// Candidate to submit; `None` if the solver declined.
    pub chosen: Option<CandidateIndex>,
    /// Full solver decision.
    pub decision: Decision,
}

#[derive(Debug, Clone)]
/// Everything that happened when an outcome was recorded.
pub struct RecordedOutcome {
    /// The stored attempt as appended.
    pub attempt: Attempt,
    /// Failures labeled retroactively by this success.
    pub retroactive_labels: usize,
    /// Immediate labeler result for a failure; `None` for successes or when labeling errored.
    pub immediate: Option<LabelOutcome>,
    /// Trigger decision, when it was consulted.
    pub trigger: Option<TriggerDecision>,
    /// Effect on model selection.
    pub selection: SelectionEvent,
}

impl RecordedOutcome {
    /// Labels written as a consequence of this outcome.
    pub fn labels_written(&self) -> usize {
        let immediate = self.immediate.is_some_and(|o| o.is_labeled());
        self.retroactive_labels + usize::from(immediate)
    }
}

#[derive(Debug, Clone)]
/// Result of [`run_challenge`](super::LearningSession::run_challenge).
pub enum ChallengeOutcome {
    /// Scoring failed; nothing was submitted or stored.
    Declined(Decision),
    /// A choice was submitted and its outcome recorded.
    Recorded(Box<RecordedOutcome>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Snapshot of the learning loop.
pub struct LearningStatus {
    /// Attempts recorded since the store was created.
    pub total_attempts: u64,
    /// Recorded attempts the application accepted.
    pub successes: u64,
    /// Recorded attempts the application rejected.
    pub failures: u64,
    /// Percent of recorded attempts that succeeded.
    pub success_rate: f64,
    /// Attempt directories under `successes/`.
    pub stored_successes: usize,
    /// Attempt directories under `failures/`.
    pub stored_failures: usize,
    /// Stored failures with a correct answer.
    pub labeled_failures: usize,
    /// Stored failures still waiting for a label.
    pub unlabeled_failures: usize,
    /// Labels written by the retroactive and immediate labelers.
    pub auto_labeled: u64,
    /// Labels written since the last training launch.
    pub labels_since_training: u64,
    /// Labels still needed before the trigger can fire.
    pub labels_until_training: u64,
    /// Training jobs launched so far.
    pub training_count: u64,
    /// When the last training job was launched.
    pub last_training: Option<DateTime<Utc>>,
    /// Variant the next solve will use.
    pub active_variant: ModelVariant,
    /// Whether a fine-tuned checkpoint is on disk.
    pub finetuned_available: bool,
    /// Tickets solved but not yet recorded.
    pub pending_tickets: usize,
}
