use tracing::{debug, info, warn};

use super::ModelVariant;
use super::config::SelectionConfig;

/// What happened when an outcome was fed into [`ModelSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Outcome was for a variant that is not active; nothing changed.
    Ignored,
    /// Success reset the active variant's counter.
    Reset,
    /// Failure incremented the active variant's counter.
    Counted {
        /// Consecutive failures after this one.
        consecutive: u32,
    },
    /// Threshold reached; the active variant changed.
    Switched {
        /// Variant that was active.
        from: ModelVariant,
        /// Variant that is now active.
        to: ModelVariant,
    },
    /// Threshold reached but the other variant is unavailable; counter reset.
    SwitchRefused {
        /// Variant that stays active.
        kept: ModelVariant,
    },
}

/// Consecutive-failure state machine over the two model variants.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    config: SelectionConfig,
    active: ModelVariant,
    baseline_failures: u32,
    finetuned_failures: u32,
    finetuned_available: bool,
}

impl ModelSelection {
    /// Creates the policy; starts on `finetuned` only if an artifact exists and it is enabled.
    pub fn new(config: SelectionConfig, finetuned_available: bool) -> Self {
        let active = if finetuned_available && config.use_finetuned {
            ModelVariant::Finetuned
        } else {
            ModelVariant::Baseline
        };

        info!(
            active = %active,
            finetuned_available,
            failure_threshold = config.failure_threshold,
            "Model selection initialised"
        );

        Self {
            config,
            active,
            baseline_failures: 0,
            finetuned_failures: 0,
            finetuned_available,
        }
    }

    /// Returns the active variant.
    pub fn active(&self) -> ModelVariant {
        self.active
    }

    /// Returns the consecutive-failure counter for `variant`.
    pub fn consecutive_failures(&self, variant: ModelVariant) -> u32 {
        match variant {
            ModelVariant::Baseline => self.baseline_failures,
            ModelVariant::Finetuned => self.finetuned_failures,
        }
    }

    /// Returns `true` if a fine-tuned artifact is known to exist.
    pub fn finetuned_available(&self) -> bool {
        self.finetuned_available
    }

    /// Marks the fine-tuned artifact as present or absent.
    ///
    /// Becoming unavailable while active falls back to the baseline immediately.
    pub fn set_finetuned_available(&mut self, available: bool) {
        self.finetuned_available = available;
        if !available && self.active == ModelVariant::Finetuned {
            warn!("Fine-tuned model no longer available, switching to baseline");
            self.active = ModelVariant::Baseline;
            self.finetuned_failures = 0;
        }
    }

    /// Records an outcome produced by `variant`.
    pub fn record_outcome(&mut self, variant: ModelVariant, succeeded: bool) -> SelectionEvent {
        if variant != self.active {
            debug!(
                variant = %variant,
                active = %self.active,
                "Outcome attributed to inactive variant, ignoring"
            );
            return SelectionEvent::Ignored;
        }

        if succeeded {
            *self.counter_mut(variant) = 0;
            return SelectionEvent::Reset;
        }

        let counter = self.counter_mut(variant);
        *counter += 1;
        let consecutive = *counter;

        if consecutive < self.config.failure_threshold {
            debug!(variant = %variant, consecutive, "Counted failure");
            return SelectionEvent::Counted { consecutive };
        }

        *self.counter_mut(variant) = 0;
        let target = variant.other();

        if !self.can_activate(target) {
            warn!(
                variant = %variant,
                consecutive,
                "Failure threshold reached but {} is unavailable",
                target
            );
            return SelectionEvent::SwitchRefused { kept: variant };
        }

        self.active = target;
        info!(
            from = %variant,
            to = %target,
            consecutive,
            "Switching model variant after consecutive failures"
        );
        SelectionEvent::Switched {
            from: variant,
            to: target,
        }
    }

    fn can_activate(&self, variant: ModelVariant) -> bool {
        match variant {
            ModelVariant::Baseline => true,
            ModelVariant::Finetuned => self.finetuned_available && self.config.use_finetuned,
        }
    }

    fn counter_mut(&mut self, variant: ModelVariant) -> &mut u32 {
        match variant {
            ModelVariant::Baseline => &mut self.baseline_failures,
            ModelVariant::Finetuned => &mut self.finetuned_failures,
        }
    }
}
