//! Retraining: when to launch, how to launch, and what the job does.
//!
//! - [`trigger`] decides when enough new labels have accumulated.
//! - [`runner`] starts the job detached from the solving loop.
//! - [`dataset`] and [`finetune`] are the job itself (`glimpse train`).

pub mod config;
pub mod dataset;
pub mod error;
pub mod finetune;
pub mod runner;
pub mod trigger;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_TRAIN_BATCH_SIZE, DEFAULT_TRAIN_EPOCHS, DEFAULT_TRAIN_LEARNING_RATE, FinetuneConfig,
    TriggerConfig,
};
pub use dataset::{DatasetSummary, TrainingSample, build_dataset};
pub use error::{TrainingError, TrainingResult};
pub use finetune::{FinetuneReport, finetune, run_training};
pub use runner::{
    JobHandle, ProcessJobRunner, TRAIN_PROGRAM, TRAIN_SUBCOMMAND, TrainingJob, TrainingJobRunner,
};
pub use trigger::{TrainingTrigger, TriggerDecision};

#[cfg(any(test, feature = "mock"))]
pub use runner::RecordingJobRunner;
