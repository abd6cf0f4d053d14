//! CLIP similarity model (safetensors + tokenizer).
//!
//! Use [`ClipModelConfig::stub`] for tests and dry runs without model files.

/// CLIP configuration.
pub mod config;


pub use config::{ClipModelConfig, clip_architecture};

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::ClipModel;
use tracing::{debug, info, warn};

use crate::challenge::Candidates;
use crate::embedding::device::select_device;
use crate::embedding::error::EmbeddingError;
use crate::embedding::model::SimilarityModel;
use crate::embedding::utils::{PromptTokenizer, candidates_to_tensor};
use crate::hashing::hash_to_u64;

/// Logit range produced by the stub backend.
const STUB_LOGIT_SCALE: f32 = 4.0;

enum ClipBackend {
    Model {
        model: ClipModel,
        tokenizer: PromptTokenizer,
        device: Device,
    },
    Stub,
}

/// Zero-shot CLIP scorer for prompt/candidate pairs (supports stub mode).
pub struct ClipSimilarity {
    backend: ClipBackend,
    config: ClipModelConfig,
}

impl std::fmt::Debug for ClipSimilarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipSimilarity")
            .field(
                "backend",
                &match &self.backend {
                    ClipBackend::Model { device, .. } => format!("Model({:?})", device),
                    ClipBackend::Stub => "Stub".to_string(),
                },
            )
            .field("model_dir", &self.config.model_dir)
            .field("image_size", &self.config.image_size)
            .finish()
    }
}

impl ClipSimilarity {
    /// Loads the model from a config (stub mode is supported).
    pub fn load(config: ClipModelConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        if config.testing_stub {
            warn!("CLIP running in STUB mode (testing only)");
            return Ok(Self {
                backend: ClipBackend::Stub,
                config,
            });
        }

        let device = select_device(config.device)?;
        debug!(?device, "Selected compute device for CLIP");

        let tokenizer = PromptTokenizer::load(&config.model_dir)?;

        let weights = config.weights_path();
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&weights], DType::F32, &device)? };
        let model = ClipModel::new(vb, &clip_architecture()).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to build CLIP model: {}", e),
            }
        })?;

        info!(
            model_dir = %config.model_dir.display(),
            image_size = config.image_size,
            "CLIP model loaded"
        );

        Ok(Self {
            backend: ClipBackend::Model {
                model,
                tokenizer,
                device,
            },
            config,
        })
    }

    /// Returns `true` if running in stub mode.
    pub fn is_stub(&self) -> bool {
        matches!(self.backend, ClipBackend::Stub)
    }

    /// Returns the config the model was loaded from.
    pub fn config(&self) -> &ClipModelConfig {
        &self.config
    }

    fn logits_with_model(
        &self,
        prompts: &[String],
        candidates: &Candidates,
        model: &ClipModel,
        tokenizer: &PromptTokenizer,
        device: &Device,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let pixel_values = candidates_to_tensor(candidates, self.config.image_size, device)?;
        let input_ids = tokenizer.encode_batch(prompts, device)?;

        let (logits_per_text, _logits_per_image) = model.forward(&pixel_values, &input_ids)?;
        let logits = logits_per_text.to_dtype(DType::F32)?.to_vec2::<f32>()?;

        debug!(
            prompts = prompts.len(),
            candidates = candidates.len(),
            "Computed CLIP similarity logits"
        );
        Ok(logits)
    }

    fn logits_stub(prompts: &[String], candidates: &Candidates) -> Vec<Vec<f32>> {
        prompts
            .iter()
            .map(|prompt| {
                let prompt = prompt.to_lowercase();
                candidates
                    .iter()
                    .map(|(_, image)| {
                        let mut data = Vec::with_capacity(prompt.len() + image.len());
                        data.extend_from_slice(prompt.as_bytes());
                        data.extend_from_slice(image.as_bytes());
                        let unit = (hash_to_u64(&data) % 10_000) as f32 / 10_000.0;
                        unit * STUB_LOGIT_SCALE
                    })
                    .collect()
            })
            .collect()
    }
}

impl SimilarityModel for ClipSimilarity {
    fn similarity_logits(
        &self,
        prompts: &[String],
        candidates: &Candidates,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if prompts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            ClipBackend::Model {
                model,
                tokenizer,
                device,
            } => self.logits_with_model(prompts, candidates, model, tokenizer, device),
            ClipBackend::Stub => Ok(Self::logits_stub(prompts, candidates)),
        }
    }

    fn describe(&self) -> String {
        if self.is_stub() {
            "clip-stub".to_string()
        } else {
            format!("clip({})", self.config.model_dir.display())
        }
    }
}
