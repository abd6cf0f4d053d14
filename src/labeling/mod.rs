//! Labeling of failed attempts.
//!
//! Three label sources, all first-writer-wins:
//! - [`retroactive`]: a later success with the same question reveals the answer.
//! - [`immediate`]: the baseline model's own prediction, when the confidence gate trusts it.
//! - [`manual`]: an operator.
//!
//! [`relabel`] runs the immediate labeler over the whole failure partition.

pub mod error;
pub mod immediate;
pub mod manual;
pub mod relabel;
pub mod retroactive;

#[cfg(test)]
mod tests;

pub use error::{LabelingError, LabelingResult};
pub use immediate::{ImmediateLabeler, LabelOutcome, Prediction};
pub use manual::label_manually;
pub use relabel::{RelabelEntry, RelabelOptions, RelabelReport, relabel_failures};
pub use retroactive::propagate_success;
