//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants (e.g. the random baseline) from primary ones to avoid drift.
//!
//! # Candidate Count Invariant
//!
//! Every challenge offers exactly [`NUM_CANDIDATES`] images. The count is a compile-time
//! invariant across modules (embedding, scoring, storage, training). Use
//! [`validate_candidate_count`] at module boundaries to reject malformed input early.

/// Number of candidate images in one challenge.
pub const NUM_CANDIDATES: usize = 4;

/// Score (in percent) a uniform random guess would get.
pub const RANDOM_BASELINE_PCT: f32 = 100.0 / NUM_CANDIDATES as f32;

/// Percentage points above [`RANDOM_BASELINE_PCT`] required to trust a guess.
pub const DEFAULT_CONF_MARGIN_ABS: f32 = 10.0;

/// Percentage points between the best and second-best candidate required to trust a guess.
pub const DEFAULT_CONF_MARGIN_REL: f32 = 5.0;

/// Best score (percent) below which a fine-tuned result is re-checked with the baseline.
pub const DEFAULT_FALLBACK_MIN_CONFIDENCE: f32 = 60.0;

/// Margin (percent) below which a fine-tuned result is re-checked with the baseline.
pub const DEFAULT_FALLBACK_MIN_MARGIN: f32 = 8.0;

/// New labels required before a retraining job may launch.
pub const DEFAULT_TRAINING_LABEL_THRESHOLD: u64 = 20;

/// Minimum seconds between two retraining launches.
pub const DEFAULT_TRAINING_MIN_INTERVAL_SECS: u64 = 60 * 60;

/// Consecutive failures of the active model variant before switching.
pub const DEFAULT_SWITCH_FAILURE_THRESHOLD: u32 = 5;

/// Partition directory holding successful attempts.
pub const SUCCESS_PARTITION_DIR: &str = "successes";

/// Partition directory holding failed attempts.
pub const FAILURE_PARTITION_DIR: &str = "failures";

/// Metadata record inside each attempt directory.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Rolling counters file at the store root.
pub const STATS_FILENAME: &str = "learning_stats.json";

/// Advisory lock file at the store root.
pub const LOCK_FILENAME: &str = ".lock";

/// Default store root.
pub const DEFAULT_STORE_PATH: &str = "captcha_learning";

/// Default baseline (pretrained) model directory.
pub const DEFAULT_BASELINE_MODEL_DIR: &str = "models/clip-base";

/// Default fine-tuned model directory.
pub const DEFAULT_FINETUNED_MODEL_DIR: &str = "models/clip-finetuned";

/// Weights file name inside a model directory.
pub const MODEL_WEIGHTS_FILENAME: &str = "model.safetensors";

/// Tokenizer file name inside a model directory.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Side length of the square CLIP input image.
pub const CLIP_IMAGE_SIZE: usize = 224;

/// Returns the file name used for the candidate at 1-based `index`.
pub fn candidate_filename(index: usize) -> String {
    format!("button_{index}.png")
}

/// Error returned when a candidate set has the wrong size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCountError {
    /// Expected candidate count.
    pub expected: usize,
    /// Actual candidate count.
    pub actual: usize,
}

impl std::fmt::Display for CandidateCountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "expected {} candidates, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for CandidateCountError {}

/// Validates that a candidate set has exactly [`NUM_CANDIDATES`] entries.
///
/// # Example
///
/// ```
/// use glimpse::constants::{validate_candidate_count, NUM_CANDIDATES};
///
/// assert!(validate_candidate_count(NUM_CANDIDATES).is_ok());
/// assert!(validate_candidate_count(3).is_err());
/// ```
pub fn validate_candidate_count(actual: usize) -> Result<(), CandidateCountError> {
    if actual != NUM_CANDIDATES {
        return Err(CandidateCountError {
            expected: NUM_CANDIDATES,
            actual,
        });
    }
    Ok(())
}
