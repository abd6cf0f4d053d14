use serde::Serialize;
use tracing::{info, warn};

use crate::challenge::CandidateIndex;
use crate::storage::{AttemptId, AttemptStore, Partition};

use super::error::LabelingResult;
use super::immediate::{ImmediateLabeler, LabelOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// How a batch relabel pass behaves.
pub struct RelabelOptions {
    /// Predict but never write.
    pub dry_run: bool,
    /// Report predictions for every failure, labeled ones included; never write.
    pub review: bool,
}

impl RelabelOptions {
    /// Writes labels for unlabeled failures.
    pub fn apply() -> Self {
        Self::default()
    }

    /// Predicts without writing.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            review: false,
        }
    }

    /// Reviews every failure without writing.
    pub fn review() -> Self {
        Self {
            dry_run: false,
            review: true,
        }
    }

    /// Returns `true` if this pass may write labels.
    pub fn writes(&self) -> bool {
        !self.dry_run && !self.review
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// One line of a relabel report.
pub struct RelabelEntry {
    /// Attempt id.
    pub id: AttemptId,
    /// Question text.
    pub question: String,
    /// Existing label, if any.
    pub existing_label: Option<CandidateIndex>,
    /// Model's pick.
    pub predicted: CandidateIndex,
    /// Best score in percent.
    pub confidence: f32,
    /// Best minus runner-up, in percent.
    pub margin: f32,
    /// Whether the gate passed.
    pub trusted: bool,
    /// Whether a label was written in this pass.
    pub written: bool,
}

impl RelabelEntry {
    /// Returns `Some(agrees)` when the attempt already had a label.
    pub fn agrees_with_existing(&self) -> Option<bool> {
        self.existing_label.map(|label| label == self.predicted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Summary of a batch relabel pass.
pub struct RelabelReport {
    /// Failures considered.
    pub examined: usize,
    /// Labels written.
    pub labeled: usize,
    /// Predictions below the gate.
    pub withheld: usize,
    /// Failures skipped because they were already labeled.
    pub already_labeled: usize,
    /// Failures whose images could not be scored.
    pub errors: usize,
    /// Per-attempt predictions.
    pub entries: Vec<RelabelEntry>,
}

impl RelabelReport {
    /// Trusted predictions (written or, in dry-run/review, writable).
    pub fn trusted(&self) -> usize {
        self.entries.iter().filter(|e| e.trusted).count()
    }
}

/// Runs the immediate labeler over every stored failure.
pub fn relabel_failures(
    store: &AttemptStore,
    labeler: &ImmediateLabeler,
    options: RelabelOptions,
) -> LabelingResult<RelabelReport> {
    let mut report = RelabelReport::default();

    for attempt in store.read_all(Partition::Failures)? {
        if attempt.is_labeled() && !options.review {
            report.already_labeled += 1;
            continue;
        }
        report.examined += 1;

        let (prediction, written) = if options.writes() {
            match labeler.label_without_stats(store, &attempt) {
                Ok(LabelOutcome::Labeled(p)) => (p, true),
                Ok(LabelOutcome::Withheld(p)) => (p, false),
                Ok(LabelOutcome::AlreadyLabeled) => {
                    report.already_labeled += 1;
                    continue;
                }
                Err(e) => {
                    warn!(id = %attempt.id, error = %e, "Relabel failed for attempt");
                    report.errors += 1;
                    continue;
                }
            }
        } else {
            match labeler.predict(store, &attempt) {
                Ok(p) => (p, false),
                Err(e) => {
                    warn!(id = %attempt.id, error = %e, "Prediction failed for attempt");
                    report.errors += 1;
                    continue;
                }
            }
        };

        if written {
            report.labeled += 1;
        } else if !prediction.trusted {
            report.withheld += 1;
        }

        report.entries.push(RelabelEntry {
            id: attempt.id,
            question: attempt.question,
            existing_label: attempt.correct_answer,
            predicted: prediction.answer,
            confidence: prediction.confidence,
            margin: prediction.margin,
            trusted: prediction.trusted,
            written,
        });
    }

    if report.labeled > 0 {
        let labeled = report.labeled as u64;
        store.update_stats(|stats| stats.record_labels(labeled, true))?;
    }

    info!(
        examined = report.examined,
        labeled = report.labeled,
        withheld = report.withheld,
        already_labeled = report.already_labeled,
        errors = report.errors,
        dry_run = options.dry_run,
        review = options.review,
        "Relabel pass complete"
    );
    Ok(report)
}
