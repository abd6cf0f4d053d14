use std::io;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use tokenizers::Tokenizer;

use super::error::EmbeddingError;
use crate::challenge::Candidates;
use crate::constants::TOKENIZER_FILENAME;

/// CLIP's end-of-text token, also used for padding.
pub const END_OF_TEXT_TOKEN: &str = "<|endoftext|>";

/// CLIP text encoder context length.
pub const CLIP_MAX_TOKENS: usize = 77;

/// Loads a tokenizer from a model directory or explicit tokenizer.json path.
pub fn load_tokenizer(model_path: &Path) -> io::Result<Tokenizer> {
    let tokenizer_path = if model_path
        .file_name()
        .is_some_and(|name| name == std::ffi::OsStr::new(TOKENIZER_FILENAME))
    {
        model_path.to_path_buf()
    } else if model_path.is_dir() {
        model_path.join(TOKENIZER_FILENAME)
    } else {
        model_path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Model path has no parent"))?
            .join(TOKENIZER_FILENAME)
    };

    Tokenizer::from_file(&tokenizer_path).map_err(io::Error::other)
}

/// Tokenizer that turns a batch of prompts into a padded `[batch, seq]` id tensor.
pub struct PromptTokenizer {
    tokenizer: Tokenizer,
    pad_id: u32,
    max_len: usize,
}

impl std::fmt::Debug for PromptTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTokenizer")
            .field("pad_id", &self.pad_id)
            .field("max_len", &self.max_len)
            .finish()
    }
}

impl PromptTokenizer {
    /// Loads `tokenizer.json` from `model_dir`; padding uses [`END_OF_TEXT_TOKEN`].
    pub fn load(model_dir: &Path) -> Result<Self, EmbeddingError> {
        let tokenizer =
            load_tokenizer(model_dir).map_err(|e| EmbeddingError::TokenizationFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            })?;

        let pad_id = tokenizer.token_to_id(END_OF_TEXT_TOKEN).ok_or_else(|| {
            EmbeddingError::TokenizationFailed {
                reason: format!("tokenizer has no {END_OF_TEXT_TOKEN} token"),
            }
        })?;

        Ok(Self {
            tokenizer,
            pad_id,
            max_len: CLIP_MAX_TOKENS,
        })
    }

    /// Encodes prompts into a right-padded `[prompts.len(), longest]` u32 tensor.
    pub fn encode_batch(&self, prompts: &[String], device: &Device) -> Result<Tensor, EmbeddingError> {
        let mut rows: Vec<Vec<u32>> = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let encoding = self.tokenizer.encode(prompt.as_str(), true).map_err(|e| {
                EmbeddingError::TokenizationFailed {
                    reason: e.to_string(),
                }
            })?;
            let mut ids = encoding.get_ids().to_vec();
            ids.truncate(self.max_len);
            rows.push(ids);
        }

        let longest = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for row in &mut rows {
            row.resize(longest, self.pad_id);
        }

        let flat: Vec<u32> = rows.into_iter().flatten().collect();
        Ok(Tensor::from_vec(flat, (prompts.len(), longest), device)?)
    }
}

/// Decodes one image into a normalised `[3, size, size]` f32 tensor in `[-1, 1]`.
pub fn image_to_tensor(
    bytes: &[u8],
    size: usize,
    device: &Device,
) -> Result<Tensor, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let img = img.resize_to_fill(size as u32, size as u32, FilterType::Triangle);
    let raw = img.to_rgb8().into_raw();

    Tensor::from_vec(raw, (size, size, 3), device)
        .and_then(|t| t.permute((2, 0, 1)))
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.affine(2. / 255., -1.))
        .map_err(|e| {
            image::ImageError::IoError(io::Error::other(format!(
                "failed to build image tensor: {e}"
            )))
        })
}

/// Decodes every candidate and stacks them into a `[n, 3, size, size]` tensor.
pub fn candidates_to_tensor(
    candidates: &Candidates,
    size: usize,
    device: &Device,
) -> Result<Tensor, EmbeddingError> {
    let mut images = Vec::with_capacity(candidates.len());
    for (index, image) in candidates.iter() {
        let tensor = image_to_tensor(image.as_bytes(), size, device).map_err(|e| {
            EmbeddingError::ImageDecodeFailed {
                index: usize::from(index.get()),
                reason: e.to_string(),
            }
        })?;
        images.push(tensor);
    }
    Ok(Tensor::stack(&images, 0)?)
}
