use tracing::{debug, info, warn};

use crate::hashing::questions_match;
use crate::storage::{Attempt, AttemptStore, LabelSource, LabelUpdate, Partition};

use super::error::{LabelingError, LabelingResult};

/// Copies a success's answer onto earlier unlabeled failures with the same question.
///
/// Returns how many failures were labeled. The auto-label counters are bumped by that
/// amount; the caller decides whether to consult the training trigger.
pub fn propagate_success(store: &AttemptStore, success: &Attempt) -> LabelingResult<usize> {
    let Some(answer) = success.chosen_index.filter(|_| success.succeeded) else {
        return Err(LabelingError::WrongPartition {
            id: success.id.to_string(),
            expected: "success with a chosen candidate",
        });
    };

    let update = LabelUpdate::new(answer, LabelSource::RetroactiveFromSuccess);
    let mut labeled = 0usize;

    for failure in store.read_all(Partition::Failures)? {
        if failure.is_labeled() || !questions_match(&failure.question, &success.question) {
            continue;
        }

        match store.update_label(&failure.id, &update) {
            Ok(true) => {
                debug!(failure = %failure.id, success = %success.id, "Retroactively labeled failure");
                labeled += 1;
            }
            Ok(false) => {}
            Err(e) => warn!(failure = %failure.id, error = %e, "Failed to label failure, skipping"),
        }
    }

    if labeled > 0 {
        store.update_stats(|stats| stats.record_labels(labeled as u64, true))?;
        info!(
            question = %success.question,
            answer = answer.get(),
            labeled,
            "Propagated success answer to earlier failures"
        );
    }

    Ok(labeled)
}
