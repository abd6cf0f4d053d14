use crate::constants::{
    DEFAULT_CONF_MARGIN_ABS, DEFAULT_CONF_MARGIN_REL, DEFAULT_FALLBACK_MIN_CONFIDENCE,
    DEFAULT_FALLBACK_MIN_MARGIN,
};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Confidence gate applied to every scored challenge (values in percentage points).
pub struct GateConfig {
    /// Points above the random baseline the best candidate must reach.
    pub conf_margin_abs: f32,
    /// Points the best candidate must lead the runner-up by.
    pub conf_margin_rel: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            conf_margin_abs: DEFAULT_CONF_MARGIN_ABS,
            conf_margin_rel: DEFAULT_CONF_MARGIN_REL,
        }
    }
}

impl GateConfig {
    /// Creates a gate with explicit margins.
    pub fn new(conf_margin_abs: f32, conf_margin_rel: f32) -> Self {
        Self {
            conf_margin_abs,
            conf_margin_rel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// When a weak fine-tuned result is re-checked with the baseline.
pub struct FallbackConfig {
    /// If false, fine-tuned results are never re-checked.
    pub enabled: bool,
    /// Best score (percent) under which a result counts as weak.
    pub min_confidence: f32,
    /// Margin (percent) under which a result counts as weak.
    pub min_margin: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: DEFAULT_FALLBACK_MIN_CONFIDENCE,
            min_margin: DEFAULT_FALLBACK_MIN_MARGIN,
        }
    }
}

impl FallbackConfig {
    /// Fallback switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns `true` if a result with this confidence and margin is weak.
    pub fn is_weak(&self, confidence: f32, margin: f32) -> bool {
        confidence < self.min_confidence || margin < self.min_margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Configuration for [`VerificationSolver`](super::VerificationSolver).
pub struct SolverConfig {
    /// Trust gate.
    pub gate: GateConfig,
    /// Low-confidence fallback.
    pub fallback: FallbackConfig,
}
