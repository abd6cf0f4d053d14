use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::challenge::Candidates;
use crate::config::Config;
use crate::embedding::{EmbeddingScorer, ModelRegistry};
use crate::labeling::{
    ImmediateLabeler, RelabelOptions, RelabelReport, label_manually,
    propagate_success, relabel_failures,
};
use crate::scoring::{Decision, VerificationSolver};
use crate::selection::{ModelSelection, ModelVariant};
use crate::storage::{AttemptId, AttemptStore, NewAttempt, Partition};
use crate::training::{TrainingJobRunner, TrainingTrigger, TriggerDecision};

use super::driver::ChallengeDriver;
use super::error::{SessionError, SessionResult};
use super::types::{
    ChallengeOutcome, LearningStatus, RecordedOutcome, SessionConfig, SolveTicket,
};

#[derive(Debug)]
struct PendingAttempt {
    question: String,
    candidates: Candidates,
    decision: Decision,
}

/// The self-improving loop: solve, record, label, retrain, switch.
///
/// Solved challenges are held in memory until their outcome is known; an outcome that is
/// never reported leaves nothing on disk.
pub struct LearningSession {
    store: AttemptStore,
    registry: Arc<ModelRegistry>,
    solver: VerificationSolver,
    labeler: ImmediateLabeler,
    trigger: TrainingTrigger,
    selection: Mutex<ModelSelection>,
    pending: Mutex<HashMap<u64, PendingAttempt>>,
    next_ticket: AtomicU64,
}

impl std::fmt::Debug for LearningSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningSession")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .field("selection", &*self.selection.lock())
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}

impl LearningSession {
    /// Creates a session over an opened store.
    pub fn new(
        store: AttemptStore,
        registry: Arc<ModelRegistry>,
        config: SessionConfig,
        runner: Arc<dyn TrainingJobRunner>,
    ) -> Self {
        let scorer = EmbeddingScorer::new(Arc::clone(&registry));
        let finetuned_available = registry.is_available(ModelVariant::Finetuned);

        Self {
            solver: VerificationSolver::new(scorer.clone(), config.solver),
            labeler: ImmediateLabeler::new(scorer, config.solver.gate),
            trigger: TrainingTrigger::new(config.trigger, runner),
            selection: Mutex::new(ModelSelection::new(config.selection, finetuned_available)),
            pending: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
            store,
            registry,
        }
    }

    /// Opens the configured store and models; training runs the configured program
    /// (see [`Config::job_runner`]).
    pub fn from_config(config: &Config) -> SessionResult<Self> {
        Self::from_config_with_runner(config, Arc::new(config.job_runner()))
    }

    /// Like [`from_config`](Self::from_config), with training jobs handed to `runner`.
    pub fn from_config_with_runner(
        config: &Config,
        runner: Arc<dyn TrainingJobRunner>,
    ) -> SessionResult<Self> {
        let store = AttemptStore::open(&config.store_path)?;
        let registry = Arc::new(ModelRegistry::new(config.model_loader()));
        Ok(Self::new(store, registry, config.session_config(), runner))
    }

    /// Returns the attempt store.
    pub fn store(&self) -> &AttemptStore {
        &self.store
    }

    /// Returns the model registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Returns the variant the next solve will use.
    pub fn active_variant(&self) -> ModelVariant {
        self.selection.lock().active()
    }

    /// Solves a challenge and parks it until [`record_outcome`](Self::record_outcome).
    pub fn solve_and_record(
        &self,
        question: impl Into<String>,
        candidates: Candidates,
    ) -> SolveTicket {
        let question = question.into();
        let active = self.refresh_selection();
        let decision = self.solver.solve(active, &question, &candidates);
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        debug!(ticket, question = %question, decision = %decision, "Challenge solved");
        self.pending.lock().insert(
            ticket,
            PendingAttempt {
                question,
                candidates,
                decision: decision.clone(),
            },
        );

        SolveTicket {
            ticket,
            chosen: decision.chosen,
            decision,
        }
    }

    /// Drops a solved ticket without recording it; returns `false` if it was unknown.
    pub fn discard(&self, ticket: u64) -> bool {
        self.pending.lock().remove(&ticket).is_some()
    }

    /// Stores the outcome of a solved ticket and runs labeling, training and selection.
    ///
    /// Labeling and trigger failures are logged and reported as absent in the result;
    /// only failing to store the attempt is an error.
    pub fn record_outcome(&self, ticket: u64, succeeded: bool) -> SessionResult<RecordedOutcome> {
        let pending = {
            let mut pending = self.pending.lock();
            let declined = pending
                .get(&ticket)
                .map(|p| p.decision.is_declined())
                .ok_or(SessionError::UnknownTicket { ticket })?;
            if succeeded && declined {
                return Err(SessionError::SuccessWithoutChoice { ticket });
            }
            pending
                .remove(&ticket)
                .ok_or(SessionError::UnknownTicket { ticket })?
        };

        let decision = pending.decision;
        let new = NewAttempt::new(
            pending.question,
            pending.candidates,
            decision.chosen,
            succeeded,
        )
        .with_solve_details(
            decision.model_used,
            decision.confidence,
            decision.margin,
            decision.trusted,
        );
        let attempt = self.store.append(&new)?;

        let mut retroactive_labels = 0;
        let mut immediate = None;

        if succeeded {
            match propagate_success(&self.store, &attempt) {
                Ok(n) => retroactive_labels = n,
                Err(e) => warn!(id = %attempt.id, error = %e, "Retroactive labeling failed"),
            }
        } else {
            match self.labeler.label_failure(&self.store, &attempt) {
                Ok(outcome) => immediate = Some(outcome),
                Err(e) => warn!(id = %attempt.id, error = %e, "Immediate labeling failed"),
            }
        }

        // Every failure consults the trigger; a success only when it wrote labels.
        let trigger = if succeeded && retroactive_labels == 0 {
            None
        } else {
            self.check_trigger()
        };

        let selection = self
            .selection
            .lock()
            .record_outcome(decision.model_used, succeeded);

        info!(
            id = %attempt.id,
            succeeded,
            model = %decision.model_used,
            retroactive_labels,
            immediate = ?immediate,
            selection = ?selection,
            "Outcome recorded"
        );

        Ok(RecordedOutcome {
            attempt,
            retroactive_labels,
            immediate,
            trigger,
            selection,
        })
    }

    /// Renders, solves, submits and records one challenge.
    ///
    /// A declined decision is not submitted and leaves nothing on disk.
    pub fn run_challenge<D: ChallengeDriver>(&self, driver: &mut D) -> SessionResult<ChallengeOutcome> {
        let challenge = driver
            .render_challenge()
            .map_err(|e| SessionError::Driver(Box::new(e)))?;

        let solved = self.solve_and_record(challenge.question, challenge.candidates);
        let Some(chosen) = solved.chosen else {
            self.discard(solved.ticket);
            return Ok(ChallengeOutcome::Declined(solved.decision));
        };

        let succeeded = match driver.submit_choice(chosen) {
            Ok(succeeded) => succeeded,
            Err(e) => {
                self.discard(solved.ticket);
                return Err(SessionError::Driver(Box::new(e)));
            }
        };

        let recorded = self.record_outcome(solved.ticket, succeeded)?;
        Ok(ChallengeOutcome::Recorded(Box::new(recorded)))
    }

    /// Labels a stored attempt by hand; returns `false` if it was already labeled.
    pub fn label_manually(&self, id: &AttemptId, index: u8) -> SessionResult<bool> {
        let written = label_manually(&self.store, id, index)?;
        if written {
            self.check_trigger();
        }
        Ok(written)
    }

    /// Runs the immediate labeler over every stored failure.
    pub fn relabel(&self, options: RelabelOptions) -> SessionResult<RelabelReport> {
        let report = relabel_failures(&self.store, &self.labeler, options)?;
        if report.labeled > 0 {
            self.check_trigger();
        }
        Ok(report)
    }

    /// Reports counters, partition sizes and the active variant.
    pub fn status(&self) -> SessionResult<LearningStatus> {
        let stats = self.store.load_stats()?;
        let failures = self.store.read_all(Partition::Failures)?;
        let labeled_failures = failures.iter().filter(|a| a.is_labeled()).count();
        let stored_successes = self.store.count(Partition::Successes)?;
        let threshold = self.trigger.config().label_threshold;

        let (active_variant, finetuned_available) = {
            let selection = self.selection.lock();
            (selection.active(), selection.finetuned_available())
        };

        Ok(LearningStatus {
            total_attempts: stats.total_attempts,
            successes: stats.successes,
            failures: stats.failures,
            success_rate: stats.success_rate(),
            stored_successes,
            stored_failures: failures.len(),
            labeled_failures,
            unlabeled_failures: failures.len() - labeled_failures,
            auto_labeled: stats.auto_labeled,
            labels_since_training: stats.labels_since_training,
            labels_until_training: threshold.saturating_sub(stats.labels_since_training),
            training_count: stats.training_count,
            last_training: stats.last_training,
            active_variant,
            finetuned_available,
            pending_tickets: self.pending.lock().len(),
        })
    }

    fn refresh_selection(&self) -> ModelVariant {
        let available = self.registry.is_available(ModelVariant::Finetuned);
        let mut selection = self.selection.lock();
        if selection.finetuned_available() != available {
            info!(available, "Fine-tuned model availability changed");
            selection.set_finetuned_available(available);
        }
        selection.active()
    }

    fn check_trigger(&self) -> Option<TriggerDecision> {
        match self.trigger.check_store(&self.store, Utc::now()) {
            Ok(decision) => Some(decision),
            Err(e) => {
                warn!(error = %e, "Training trigger check failed");
                None
            }
        }
    }
}
