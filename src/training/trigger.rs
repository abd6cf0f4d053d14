use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::storage::{AttemptStore, LearningStats, StorageResult};

use super::config::TriggerConfig;
use super::runner::{JobHandle, TrainingJob, TrainingJobRunner};

#[derive(Debug, Clone, PartialEq)]
/// Result of consulting the trigger.
pub enum TriggerDecision {
    /// Not enough new labels yet.
    Idle {
        /// Labels since the last launch.
        labels: u64,
        /// Labels required.
        threshold: u64,
    },
    /// Enough labels, but the minimum interval has not elapsed.
    Pending {
        /// Time left until a launch is allowed.
        remaining: Duration,
    },
    /// Conditions are met; [`TrainingTrigger::check`] would launch now.
    Due,
    /// A detached job was started; counters were reset.
    Launched(JobHandle),
    /// The runner could not start the job; counters were left untouched.
    SpawnFailed {
        /// Underlying error.
        reason: String,
    },
}

impl TriggerDecision {
    /// Returns `true` if a job was started.
    pub fn launched(&self) -> bool {
        matches!(self, TriggerDecision::Launched(_))
    }
}

/// Launches retraining once enough labels have accumulated, at most once per interval.
#[derive(Clone)]
pub struct TrainingTrigger {
    config: TriggerConfig,
    runner: Arc<dyn TrainingJobRunner>,
}

impl std::fmt::Debug for TrainingTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingTrigger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TrainingTrigger {
    /// Creates a trigger.
    pub fn new(config: TriggerConfig, runner: Arc<dyn TrainingJobRunner>) -> Self {
        Self { config, runner }
    }

    /// Returns the trigger configuration.
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Decides without side effects whether a launch is due.
    pub fn evaluate(&self, stats: &LearningStats, now: DateTime<Utc>) -> TriggerDecision {
        if stats.labels_since_training < self.config.label_threshold {
            return TriggerDecision::Idle {
                labels: stats.labels_since_training,
                threshold: self.config.label_threshold,
            };
        }

        if let Some(last) = stats.last_training {
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.config.min_interval {
                return TriggerDecision::Pending {
                    remaining: self.config.min_interval - elapsed,
                };
            }
        }

        TriggerDecision::Due
    }

    /// Launches a job if due and updates `stats` on a successful launch.
    ///
    /// The reset is optimistic: it does not wait for the job to succeed.
    pub fn check(
        &self,
        stats: &mut LearningStats,
        store_root: &std::path::Path,
        now: DateTime<Utc>,
    ) -> TriggerDecision {
        let decision = self.evaluate(stats, now);
        if decision != TriggerDecision::Due {
            debug!(?decision, "Training not due");
            return decision;
        }

        let job = TrainingJob {
            store_root: store_root.to_path_buf(),
            labels_since_training: stats.labels_since_training,
        };

        match self.runner.submit(&job) {
            Ok(handle) => {
                stats.record_training_launch(now);
                info!(
                    labels = job.labels_since_training,
                    training_count = stats.training_count,
                    pid = ?handle.pid,
                    "Training job launched"
                );
                TriggerDecision::Launched(handle)
            }
            Err(e) => {
                error!(error = %e, "Failed to launch training job");
                TriggerDecision::SpawnFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Runs [`check`](Self::check) against the store's persisted counters.
    pub fn check_store(&self, store: &AttemptStore, now: DateTime<Utc>) -> StorageResult<TriggerDecision> {
        let root = store.root().to_path_buf();
        store.update_stats(|stats| self.check(stats, &root, now))
    }
}
