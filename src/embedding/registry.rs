use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::clip::{ClipModelConfig, ClipSimilarity};
use super::error::EmbeddingError;
use super::model::SimilarityModel;
use crate::selection::ModelVariant;

/// Builds a [`SimilarityModel`] for a variant.
pub trait ModelLoader: Send + Sync {
    /// Loads the model for `variant`.
    fn load(&self, variant: ModelVariant) -> Result<Arc<dyn SimilarityModel>, EmbeddingError>;

    /// Returns `true` if an artifact for `variant` exists and could be loaded.
    fn is_available(&self, variant: ModelVariant) -> bool;
}

/// Loads CLIP checkpoints from the baseline and fine-tuned model directories.
#[derive(Debug, Clone)]
pub struct ClipModelLoader {
    baseline: ClipModelConfig,
    finetuned: ClipModelConfig,
}

impl ClipModelLoader {
    /// Creates a loader from one config per variant.
    pub fn new(baseline: ClipModelConfig, finetuned: ClipModelConfig) -> Self {
        Self {
            baseline,
            finetuned,
        }
    }

    /// Loader whose baseline is the stub and which has no fine-tuned artifact.
    pub fn stub() -> Self {
        Self {
            baseline: ClipModelConfig::stub(),
            finetuned: ClipModelConfig::default(),
        }
    }

    /// Returns the config used for `variant`.
    pub fn config(&self, variant: ModelVariant) -> &ClipModelConfig {
        match variant {
            ModelVariant::Baseline => &self.baseline,
            ModelVariant::Finetuned => &self.finetuned,
        }
    }
}

impl ModelLoader for ClipModelLoader {
    fn load(&self, variant: ModelVariant) -> Result<Arc<dyn SimilarityModel>, EmbeddingError> {
        let model = ClipSimilarity::load(self.config(variant).clone())?;
        Ok(Arc::new(model) as Arc<dyn SimilarityModel>)
    }

    fn is_available(&self, variant: ModelVariant) -> bool {
        self.config(variant).model_available()
    }
}

/// Lazily loads and caches one model instance per variant.
///
/// Instances are never evicted. A failed load is not cached; the next call retries.
pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    cache: Mutex<HashMap<ModelVariant, Arc<dyn SimilarityModel>>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded: Vec<ModelVariant> = self.cache.lock().keys().copied().collect();
        f.debug_struct("ModelRegistry")
            .field("loaded", &loaded)
            .finish()
    }
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached model for `variant`, loading it on first use.
    pub fn get(&self, variant: ModelVariant) -> Result<Arc<dyn SimilarityModel>, EmbeddingError> {
        let mut cache = self.cache.lock();
        if let Some(model) = cache.get(&variant) {
            return Ok(Arc::clone(model));
        }

        debug!(variant = %variant, "Loading model variant");
        let model = self.loader.load(variant)?;
        info!(variant = %variant, model = %model.describe(), "Model variant loaded");
        cache.insert(variant, Arc::clone(&model));
        Ok(model)
    }

    /// Returns `true` if `variant` has been loaded.
    pub fn is_loaded(&self, variant: ModelVariant) -> bool {
        self.cache.lock().contains_key(&variant)
    }

    /// Returns `true` if an artifact for `variant` exists.
    pub fn is_available(&self, variant: ModelVariant) -> bool {
        self.is_loaded(variant) || self.loader.is_available(variant)
    }
}
