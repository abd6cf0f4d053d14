use tracing::{info, warn};

use crate::challenge::{CandidateIndex, Candidates};
use crate::storage::{AttemptId, AttemptStore, LabelSource, Partition};

use super::error::TrainingResult;

#[derive(Debug, Clone)]
/// One 4-way ranking example.
pub struct TrainingSample {
    /// Source attempt.
    pub id: AttemptId,
    /// Question text.
    pub question: String,
    /// Candidate images.
    pub candidates: Candidates,
    /// Correct candidate.
    pub answer: CandidateIndex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Where the samples of a dataset came from.
pub struct DatasetSummary {
    /// Samples from successful attempts.
    pub from_successes: usize,
    /// Samples from failures labeled retroactively.
    pub retroactive: usize,
    /// Samples from failures labeled by the model.
    pub immediate: usize,
    /// Samples from failures labeled by an operator.
    pub manual: usize,
    /// Labeled attempts skipped because their images were unreadable.
    pub skipped: usize,
}

impl DatasetSummary {
    /// Total usable samples.
    pub fn total(&self) -> usize {
        self.from_successes + self.retroactive + self.immediate + self.manual
    }
}

/// Collects every labeled attempt whose four images are readable.
pub fn build_dataset(store: &AttemptStore) -> TrainingResult<(Vec<TrainingSample>, DatasetSummary)> {
    let mut samples = Vec::new();
    let mut summary = DatasetSummary::default();

    for partition in Partition::all() {
        for attempt in store.read_all(partition)? {
            let Some(answer) = attempt.correct_answer else {
                continue;
            };

            let candidates = match store.load_images(&attempt.id) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(id = %attempt.id, error = %e, "Skipping attempt with unreadable images");
                    summary.skipped += 1;
                    continue;
                }
            };

            match (attempt.succeeded, attempt.label_source) {
                (true, _) => summary.from_successes += 1,
                (false, Some(LabelSource::RetroactiveFromSuccess)) => summary.retroactive += 1,
                (false, Some(LabelSource::ImmediateModel)) => summary.immediate += 1,
                (false, _) => summary.manual += 1,
            }

            samples.push(TrainingSample {
                id: attempt.id,
                question: attempt.question,
                candidates,
                answer,
            });
        }
    }

    info!(
        samples = summary.total(),
        successes = summary.from_successes,
        retroactive = summary.retroactive,
        immediate = summary.immediate,
        manual = summary.manual,
        skipped = summary.skipped,
        "Training dataset built"
    );
    Ok((samples, summary))
}
