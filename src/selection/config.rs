use crate::constants::DEFAULT_SWITCH_FAILURE_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Configuration for [`ModelSelection`](super::ModelSelection).
pub struct SelectionConfig {
    /// Consecutive failures of the active variant before switching.
    pub failure_threshold: u32,
    /// If false, the fine-tuned variant is never selected.
    pub use_finetuned: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_SWITCH_FAILURE_THRESHOLD,
            use_finetuned: true,
        }
    }
}

impl SelectionConfig {
    /// Sets the switch threshold (clamped to at least 1).
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Enables or disables the fine-tuned variant.
    pub fn with_use_finetuned(mut self, enabled: bool) -> Self {
        self.use_finetuned = enabled;
        self
    }
}
