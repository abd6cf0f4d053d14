//! Model variant selection (baseline vs fine-tuned).
//!
//! [`ModelSelection`] is a small state machine: it tracks consecutive failures per variant
//! and flips the active variant when the active one keeps failing. It never touches a model,
//! so it can be driven in tests with plain outcomes.

pub mod config;
mod policy;


pub use config::SelectionConfig;
pub use policy::{ModelSelection, SelectionEvent};

use serde::{Deserialize, Serialize};

/// One of the two interchangeable embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Pretrained model as downloaded.
    Baseline,
    /// Model fine-tuned on collected labels.
    Finetuned,
}

impl ModelVariant {
    /// Returns the other variant.
    pub fn other(self) -> Self {
        match self {
            ModelVariant::Baseline => ModelVariant::Finetuned,
            ModelVariant::Finetuned => ModelVariant::Baseline,
        }
    }

    /// Returns a short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Baseline => "baseline",
            ModelVariant::Finetuned => "finetuned",
        }
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
