use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rolling counters persisted as `learning_stats.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningStats {
    /// Attempts ever recorded.
    pub total_attempts: u64,
    /// Successful attempts.
    pub successes: u64,
    /// Failed attempts.
    pub failures: u64,
    /// Labels written automatically (retroactive + immediate).
    pub auto_labeled: u64,
    /// Labels written since the last training launch.
    pub labels_since_training: u64,
    /// When training was last launched.
    pub last_training: Option<DateTime<Utc>>,
    /// Training launches so far.
    pub training_count: u64,
}

impl LearningStats {
    /// Counts a newly recorded attempt.
    pub fn record_attempt(&mut self, succeeded: bool) {
        self.total_attempts += 1;
        if succeeded {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Counts `count` new labels; `automatic` labels also bump `auto_labeled`.
    pub fn record_labels(&mut self, count: u64, automatic: bool) {
        if automatic {
            self.auto_labeled += count;
        }
        self.labels_since_training += count;
    }

    /// Resets the label counter after a training launch at `now`.
    pub fn record_training_launch(&mut self, now: DateTime<Utc>) {
        self.labels_since_training = 0;
        self.last_training = Some(now);
        self.training_count += 1;
    }

    /// Success rate in percent (0 when nothing is recorded).
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.successes as f64 * 100.0 / self.total_attempts as f64
    }
}
