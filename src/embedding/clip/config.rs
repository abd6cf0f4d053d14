use std::path::{Path, PathBuf};

use candle_transformers::models::clip::ClipConfig;

use crate::constants::{CLIP_IMAGE_SIZE, MODEL_WEIGHTS_FILENAME, TOKENIZER_FILENAME};
use crate::embedding::device::DevicePreference;
use crate::embedding::error::EmbeddingError;

/// Architecture shared by the baseline and fine-tuned checkpoints.
pub fn clip_architecture() -> ClipConfig {
    ClipConfig::vit_base_patch32()
}

#[derive(Debug, Clone)]
/// Configuration for [`ClipSimilarity`](super::ClipSimilarity).
pub struct ClipModelConfig {
    /// Directory holding `model.safetensors` and `tokenizer.json`.
    pub model_dir: PathBuf,
    /// Square input size for the vision tower.
    pub image_size: usize,
    /// Compute device preference.
    pub device: DevicePreference,
    /// If true, run in deterministic stub mode (no model files required).
    pub testing_stub: bool,
}

impl Default for ClipModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::new(),
            image_size: CLIP_IMAGE_SIZE,
            device: DevicePreference::Auto,
            testing_stub: false,
        }
    }
}

impl ClipModelConfig {
    /// Creates a config for a model directory.
    pub fn new<P: Into<PathBuf>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Default::default()
        }
    }

    /// Creates a stub config (no model files; produces deterministic logits).
    pub fn stub() -> Self {
        Self {
            testing_stub: true,
            ..Default::default()
        }
    }

    /// Sets the device preference.
    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    /// Returns the weights path inside the model directory.
    pub fn weights_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_WEIGHTS_FILENAME)
    }

    /// Returns the tokenizer path inside the model directory.
    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join(TOKENIZER_FILENAME)
    }

    /// Returns the model directory.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Validates required fields for non-stub mode.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.testing_stub {
            return Ok(());
        }

        if self.model_dir.as_os_str().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model_dir is required (stubbing is disabled)".to_string(),
            });
        }

        if self.image_size == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "image_size must be positive".to_string(),
            });
        }

        if !self.model_available() {
            return Err(EmbeddingError::ModelNotFound {
                path: self.model_dir.clone(),
            });
        }

        Ok(())
    }

    /// Returns `true` if both weights and tokenizer exist (always `true` in stub mode).
    pub fn model_available(&self) -> bool {
        if self.testing_stub {
            return true;
        }
        !self.model_dir.as_os_str().is_empty()
            && self.weights_path().is_file()
            && self.tokenizer_path().is_file()
    }
}
