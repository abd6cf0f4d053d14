//! Embedding scorer: question + candidate images → per-candidate probabilities.
//!
//! - [`clip`] wraps the CLIP text–image model (or a deterministic stub).
//! - [`registry`] loads one model per [`ModelVariant`](crate::selection::ModelVariant) lazily.
//! - [`scorer`] expands the question into paraphrases and averages the per-paraphrase softmax.

/// CLIP similarity model.
pub mod clip;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
/// Similarity model trait.
pub mod model;
/// Question paraphrases.
pub mod prompts;
/// Per-variant model cache.
pub mod registry;
/// Paraphrase-averaged candidate scoring.
pub mod scorer;
mod types;
/// Tokenizer and image preprocessing helpers.
pub mod utils;

#[cfg(any(test, feature = "mock"))]
/// Mock similarity models for tests.
pub mod mock;


pub use clip::{ClipModelConfig, ClipSimilarity};
pub use device::DevicePreference;
pub use error::EmbeddingError;
pub use model::SimilarityModel;
pub use prompts::expand_question;
pub use registry::{ClipModelLoader, ModelLoader, ModelRegistry};
pub use scorer::{EmbeddingScorer, aggregate_logits};
pub use types::CandidateScores;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockModelLoader, MockSimilarityModel};
