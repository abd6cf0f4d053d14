//! In-memory similarity model for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::EmbeddingError;
use super::model::SimilarityModel;
use super::registry::ModelLoader;
use crate::challenge::Candidates;
use crate::constants::NUM_CANDIDATES;
use crate::hashing::normalize_question;
use crate::selection::ModelVariant;

/// Returns fixed probabilities per question; logits are `ln(p)` so softmax recovers them.
#[derive(Debug, Default)]
pub struct MockSimilarityModel {
    by_question: HashMap<String, [f32; NUM_CANDIDATES]>,
    default: Option<[f32; NUM_CANDIDATES]>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockSimilarityModel {
    /// Creates a model that scores every question uniformly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a model that always fails inference.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Returns these probabilities for prompts mentioning `question`.
    pub fn with_scores(mut self, question: &str, probabilities: [f32; NUM_CANDIDATES]) -> Self {
        self.by_question
            .insert(normalize_question(question), probabilities);
        self
    }

    /// Returns these probabilities for any question without a specific entry.
    pub fn with_default(mut self, probabilities: [f32; NUM_CANDIDATES]) -> Self {
        self.default = Some(probabilities);
        self
    }

    /// Number of `similarity_logits` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn probabilities_for(&self, prompt: &str) -> [f32; NUM_CANDIDATES] {
        let prompt = prompt.to_lowercase();
        self.by_question
            .iter()
            .filter(|(question, _)| prompt.contains(question.as_str()))
            .max_by_key(|(question, _)| question.len())
            .map(|(_, p)| *p)
            .or(self.default)
            .unwrap_or([1.0 / NUM_CANDIDATES as f32; NUM_CANDIDATES])
    }
}

impl SimilarityModel for MockSimilarityModel {
    fn similarity_logits(
        &self,
        prompts: &[String],
        _candidates: &Candidates,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(EmbeddingError::InferenceFailed {
                reason: "mock inference failure".to_string(),
            });
        }

        Ok(prompts
            .iter()
            .map(|prompt| {
                self.probabilities_for(prompt)
                    .iter()
                    .map(|p| p.max(1e-6).ln())
                    .collect()
            })
            .collect())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

/// Loader handing out pre-built mock models and counting loads.
#[derive(Debug, Default)]
pub struct MockModelLoader {
    baseline: Option<Arc<MockSimilarityModel>>,
    finetuned: Option<Arc<MockSimilarityModel>>,
    loads: Arc<AtomicUsize>,
}

impl MockModelLoader {
    /// Creates a loader with only a baseline model.
    pub fn new(baseline: MockSimilarityModel) -> Self {
        Self {
            baseline: Some(Arc::new(baseline)),
            ..Self::default()
        }
    }

    /// Adds a fine-tuned model.
    pub fn with_finetuned(mut self, finetuned: MockSimilarityModel) -> Self {
        self.finetuned = Some(Arc::new(finetuned));
        self
    }

    /// Shared load counter (clone before moving the loader into a registry).
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }

    /// Returns the model registered for `variant`.
    pub fn model(&self, variant: ModelVariant) -> Option<Arc<MockSimilarityModel>> {
        match variant {
            ModelVariant::Baseline => self.baseline.clone(),
            ModelVariant::Finetuned => self.finetuned.clone(),
        }
    }
}

impl ModelLoader for MockModelLoader {
    fn load(&self, variant: ModelVariant) -> Result<Arc<dyn SimilarityModel>, EmbeddingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.model(variant) {
            Some(model) => Ok(model as Arc<dyn SimilarityModel>),
            None => Err(EmbeddingError::VariantUnavailable {
                variant: variant.to_string(),
            }),
        }
    }

    fn is_available(&self, variant: ModelVariant) -> bool {
        self.model(variant).is_some()
    }
}
