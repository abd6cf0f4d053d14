use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BASELINE_MODEL_DIR, DEFAULT_FINETUNED_MODEL_DIR, DEFAULT_TRAINING_LABEL_THRESHOLD,
    DEFAULT_TRAINING_MIN_INTERVAL_SECS,
};
use crate::embedding::DevicePreference;

use super::error::{TrainingError, TrainingResult};

/// Default fine-tuning epochs.
pub const DEFAULT_TRAIN_EPOCHS: usize = 10;
/// Default fine-tuning batch size (challenges per optimizer step).
pub const DEFAULT_TRAIN_BATCH_SIZE: usize = 4;
/// Default AdamW learning rate.
pub const DEFAULT_TRAIN_LEARNING_RATE: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// When the training trigger launches a job.
pub struct TriggerConfig {
    /// New labels required since the last launch.
    pub label_threshold: u64,
    /// Minimum time between launches.
    pub min_interval: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            label_threshold: DEFAULT_TRAINING_LABEL_THRESHOLD,
            min_interval: Duration::from_secs(DEFAULT_TRAINING_MIN_INTERVAL_SECS),
        }
    }
}

impl TriggerConfig {
    /// Sets the label threshold (clamped to at least 1).
    pub fn with_label_threshold(mut self, threshold: u64) -> Self {
        self.label_threshold = threshold.max(1);
        self
    }

    /// Sets the minimum interval between launches.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Fine-tuning hyperparameters and model locations.
pub struct FinetuneConfig {
    /// Pretrained checkpoint to start from.
    pub baseline_dir: PathBuf,
    /// Where the fine-tuned checkpoint is written.
    pub output_dir: PathBuf,
    /// Passes over the dataset.
    pub epochs: usize,
    /// Challenges per optimizer step.
    pub batch_size: usize,
    /// AdamW learning rate.
    pub learning_rate: f64,
    /// Compute device preference.
    pub device: DevicePreference,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from(DEFAULT_BASELINE_MODEL_DIR),
            output_dir: PathBuf::from(DEFAULT_FINETUNED_MODEL_DIR),
            epochs: DEFAULT_TRAIN_EPOCHS,
            batch_size: DEFAULT_TRAIN_BATCH_SIZE,
            learning_rate: DEFAULT_TRAIN_LEARNING_RATE,
            device: DevicePreference::Auto,
        }
    }
}

impl FinetuneConfig {
    /// Validates hyperparameters and paths.
    pub fn validate(&self) -> TrainingResult<()> {
        let invalid = |reason: String| Err(TrainingError::InvalidConfig { reason });

        if self.epochs == 0 {
            return invalid("epochs must be positive".to_string());
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.baseline_dir == self.output_dir {
            return invalid("output_dir must differ from baseline_dir".to_string());
        }
        Ok(())
    }
}
