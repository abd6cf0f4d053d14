//! Verification solver: scores a challenge and decides whether to trust the top candidate.
//!
//! A guess is trusted only when the best candidate clears the random baseline by
//! [`GateConfig::conf_margin_abs`] points **and** leads the runner-up by
//! [`GateConfig::conf_margin_rel`] points. Untrusted decisions still carry the top
//! candidate; only scoring failures produce `chosen == None`.
//!
//! # Fallback
//!
//! When the fine-tuned variant is active and its result is weak (see [`FallbackConfig`]),
//! the solver re-scores with the baseline and keeps whichever best score is higher.
//! [`Decision::model_used`] names the variant that was adopted.

pub mod config;
pub mod error;
pub mod solver;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{FallbackConfig, GateConfig, SolverConfig};
pub use error::{ScoringError, ScoringResult};
pub use solver::VerificationSolver;
pub use types::{Decision, GateVerdict};
