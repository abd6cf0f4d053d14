//! Fine-tuning CLIP on labeled attempts.
//!
//! Each sample is a 4-way ranking problem: the prompt `"a {question}"` is scored against
//! the four candidate images and cross-entropy pushes the correct candidate's logit up.
//! The whole model is trained with AdamW; the result is written atomically as
//! `model.safetensors` in the fine-tuned model directory.

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{D, DType, Device, Tensor};
use candle_nn::optim::{AdamW, Optimizer, ParamsAdamW};
use candle_nn::{VarBuilder, VarMap, loss};
use candle_transformers::models::clip::ClipModel;
use tracing::{debug, info};

use crate::constants::{CLIP_IMAGE_SIZE, MODEL_WEIGHTS_FILENAME, TOKENIZER_FILENAME};
use crate::embedding::EmbeddingError;
use crate::embedding::clip::{ClipModelConfig, clip_architecture};
use crate::embedding::device::select_device;
use crate::embedding::prompts::training_prompt;
use crate::embedding::utils::{PromptTokenizer, candidates_to_tensor};
use crate::hashing::hash_to_u64;
use crate::storage::AttemptStore;

use super::config::FinetuneConfig;
use super::dataset::{DatasetSummary, TrainingSample, build_dataset};
use super::error::{TrainingError, TrainingResult};

#[derive(Debug, Clone, PartialEq)]
/// Outcome of a fine-tuning run.
pub struct FinetuneReport {
    /// Samples trained on.
    pub samples: usize,
    /// Epochs completed.
    pub epochs: usize,
    /// Mean loss of the last epoch.
    pub final_loss: f32,
    /// Training accuracy of the last epoch, in percent.
    pub final_accuracy: f32,
    /// Written weights file.
    pub weights_path: PathBuf,
}

struct PreparedSample {
    pixel_values: Tensor,
    input_ids: Tensor,
    target: u32,
}

/// Builds the dataset from `store` and fine-tunes; the `train` subcommand entry point.
pub fn run_training(
    store: &AttemptStore,
    config: &FinetuneConfig,
) -> TrainingResult<(FinetuneReport, DatasetSummary)> {
    config.validate()?;
    let (samples, summary) = build_dataset(store)?;
    if samples.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    let report = finetune(config, &samples)?;
    Ok((report, summary))
}

/// Fine-tunes the baseline checkpoint on `samples` and writes the result.
pub fn finetune(config: &FinetuneConfig, samples: &[TrainingSample]) -> TrainingResult<FinetuneReport> {
    config.validate()?;
    if samples.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    let baseline = ClipModelConfig::new(&config.baseline_dir);
    if !baseline.model_available() {
        return Err(EmbeddingError::ModelNotFound {
            path: config.baseline_dir.clone(),
        }
        .into());
    }

    let device = select_device(config.device)?;
    let tokenizer = PromptTokenizer::load(&config.baseline_dir)?;

    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = ClipModel::new(vb, &clip_architecture())?;
    varmap.load(baseline.weights_path())?;

    info!(
        samples = samples.len(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        learning_rate = config.learning_rate,
        "Starting fine-tuning"
    );

    let prepared = prepare_samples(samples, &tokenizer, &device)?;

    let params = ParamsAdamW {
        lr: config.learning_rate,
        ..Default::default()
    };
    let mut optimizer = AdamW::new(varmap.all_vars(), params)?;

    let mut final_loss = 0.0f32;
    let mut final_accuracy = 0.0f32;

    for epoch in 0..config.epochs {
        let order = epoch_order(prepared.len(), epoch);
        let mut loss_sum = 0.0f32;
        let mut batches = 0usize;
        let mut correct = 0usize;

        for batch in order.chunks(config.batch_size) {
            let mut rows = Vec::with_capacity(batch.len());
            let mut targets = Vec::with_capacity(batch.len());
            for &i in batch {
                let sample = &prepared[i];
                let (logits_per_text, _) = model.forward(&sample.pixel_values, &sample.input_ids)?;
                rows.push(logits_per_text);
                targets.push(sample.target);
            }

            let logits = Tensor::cat(&rows, 0)?;
            let target = Tensor::new(targets.as_slice(), &device)?;
            let batch_loss = loss::cross_entropy(&logits, &target)?;
            optimizer.backward_step(&batch_loss)?;

            let predicted: Vec<u32> = logits.argmax(D::Minus1)?.to_vec1()?;
            correct += predicted
                .iter()
                .zip(&targets)
                .filter(|(p, t)| p == t)
                .count();
            loss_sum += batch_loss.to_scalar::<f32>()?;
            batches += 1;
        }

        final_loss = loss_sum / batches.max(1) as f32;
        final_accuracy = correct as f32 * 100.0 / prepared.len() as f32;
        info!(
            epoch = epoch + 1,
            loss = final_loss,
            accuracy = final_accuracy,
            "Epoch complete"
        );
    }

    let weights_path = save_checkpoint(&varmap, &config.baseline_dir, &config.output_dir)?;
    info!(path = %weights_path.display(), "Fine-tuned model written");

    Ok(FinetuneReport {
        samples: prepared.len(),
        epochs: config.epochs,
        final_loss,
        final_accuracy,
        weights_path,
    })
}

fn prepare_samples(
    samples: &[TrainingSample],
    tokenizer: &PromptTokenizer,
    device: &Device,
) -> TrainingResult<Vec<PreparedSample>> {
    let mut prepared = Vec::with_capacity(samples.len());
    for sample in samples {
        let pixel_values = candidates_to_tensor(&sample.candidates, CLIP_IMAGE_SIZE, device)?;
        let input_ids = tokenizer.encode_batch(&[training_prompt(&sample.question)], device)?;
        prepared.push(PreparedSample {
            pixel_values,
            input_ids,
            target: u32::from(sample.answer.get()) - 1,
        });
    }
    debug!(samples = prepared.len(), "Prepared training tensors");
    Ok(prepared)
}

/// Deterministic per-epoch shuffle of `0..len`.
pub(crate) fn epoch_order(len: usize, epoch: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by_key(|&i| {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&(epoch as u64).to_le_bytes());
        key[8..].copy_from_slice(&(i as u64).to_le_bytes());
        hash_to_u64(&key)
    });
    order
}

fn save_checkpoint(varmap: &VarMap, baseline_dir: &Path, output_dir: &Path) -> TrainingResult<PathBuf> {
    fs::create_dir_all(output_dir)?;

    // tokenizer first: the checkpoint counts as present once the weights appear
    let tokenizer_src = baseline_dir.join(TOKENIZER_FILENAME);
    let tokenizer_dst = output_dir.join(TOKENIZER_FILENAME);
    let temp_tokenizer = output_dir.join(format!("{TOKENIZER_FILENAME}.tmp"));
    fs::copy(&tokenizer_src, &temp_tokenizer)?;
    fs::rename(&temp_tokenizer, &tokenizer_dst)?;

    let weights_path = output_dir.join(MODEL_WEIGHTS_FILENAME);
    let temp_path = output_dir.join(format!("{MODEL_WEIGHTS_FILENAME}.tmp"));
    varmap.save(&temp_path)?;
    fs::rename(&temp_path, &weights_path)?;

    Ok(weights_path)
}
