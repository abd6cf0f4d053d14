use tracing::info;

use crate::challenge::CandidateIndex;
use crate::storage::{AttemptId, AttemptStore, LabelSource, LabelUpdate};

use super::error::{LabelingError, LabelingResult};

/// Writes an operator-supplied label; returns `false` if the attempt was already labeled.
///
/// Manual labels count towards the next training run but not towards `auto_labeled`.
pub fn label_manually(store: &AttemptStore, id: &AttemptId, index: u8) -> LabelingResult<bool> {
    let answer = CandidateIndex::new(index).ok_or(LabelingError::InvalidIndex { index })?;

    let written = store.update_label(id, &LabelUpdate::new(answer, LabelSource::Manual))?;
    if written {
        store.update_stats(|stats| stats.record_labels(1, false))?;
        info!(id = %id, answer = index, "Attempt labeled manually");
    }
    Ok(written)
}
