//! Glimpse library crate (used by the `glimpse` binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Session
//! - [`LearningSession`] - solve, record, label, retrain and switch models in one loop
//! - [`ChallengeDriver`] - the application that renders challenges and judges answers
//!
//! ## Scoring
//! - [`EmbeddingScorer`], [`ModelRegistry`] - CLIP similarity over four candidates
//! - [`VerificationSolver`], [`Decision`] - confidence gate and baseline fallback
//!
//! ## Learning
//! - [`AttemptStore`] - on-disk successes and failures with their labels
//! - [`propagate_success`], [`ImmediateLabeler`], [`label_manually`] - label sources
//! - [`TrainingTrigger`], [`ProcessJobRunner`], [`run_training`] - retraining
//! - [`ModelSelection`] - baseline / fine-tuned switching
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod challenge;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod hashing;
pub mod labeling;
pub mod scoring;
pub mod selection;
pub mod session;
pub mod storage;
pub mod training;

pub use challenge::{CandidateImage, CandidateIndex, Candidates, Challenge};
pub use config::{Config, ConfigError};
pub use constants::{CandidateCountError, NUM_CANDIDATES, RANDOM_BASELINE_PCT};
pub use embedding::{
    CandidateScores, ClipModelConfig, ClipModelLoader, DevicePreference, EmbeddingError,
    EmbeddingScorer, ModelLoader, ModelRegistry, SimilarityModel,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::{MockModelLoader, MockSimilarityModel};
pub use hashing::{normalize_question, questions_match};
pub use labeling::{
    ImmediateLabeler, LabelOutcome, LabelingError, RelabelOptions, RelabelReport,
    label_manually, propagate_success, relabel_failures,
};
pub use scoring::{Decision, GateConfig, ScoringError, SolverConfig, VerificationSolver};
pub use selection::{ModelSelection, ModelVariant, SelectionConfig, SelectionEvent};
pub use session::{
    ChallengeDriver, ChallengeOutcome, LearningSession, LearningStatus, RecordedOutcome,
    SessionConfig, SessionError, SolveTicket,
};
pub use storage::{
    Attempt, AttemptId, AttemptStore, LabelSource, LearningStats, NewAttempt, Partition,
    StorageError,
};
#[cfg(any(test, feature = "mock"))]
pub use training::RecordingJobRunner;
pub use training::{
    FinetuneConfig, ProcessJobRunner, TrainingError, TrainingJobRunner, TrainingTrigger,
    TriggerConfig, TriggerDecision, run_training,
};
