//! Attempt store: every solved challenge on disk, split into successes and failures.
//!
//! Attempts are append-only; only the labeling fields of an unlabeled attempt may be
//! written, once. Read-modify-write sections (labels, counters) hold a store-wide lock
//! that covers other threads and other processes.

pub mod error;
mod lock;
pub mod model;
pub mod stats;
pub mod store;


pub use error::{StorageError, StorageResult};
pub use model::{Attempt, AttemptId, LabelSource, LabelUpdate, NewAttempt, Partition};
pub use stats::LearningStats;
pub use store::AttemptStore;
