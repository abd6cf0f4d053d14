//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `GLIMPSE_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BASELINE_MODEL_DIR, DEFAULT_CONF_MARGIN_ABS, DEFAULT_CONF_MARGIN_REL,
    DEFAULT_FALLBACK_MIN_CONFIDENCE, DEFAULT_FALLBACK_MIN_MARGIN, DEFAULT_FINETUNED_MODEL_DIR,
    DEFAULT_STORE_PATH, DEFAULT_SWITCH_FAILURE_THRESHOLD, DEFAULT_TRAINING_LABEL_THRESHOLD,
    DEFAULT_TRAINING_MIN_INTERVAL_SECS,
};
use crate::embedding::{ClipModelConfig, ClipModelLoader, DevicePreference};
use crate::scoring::{FallbackConfig, GateConfig, SolverConfig};
use crate::selection::SelectionConfig;
use crate::session::SessionConfig;
use crate::training::{
    DEFAULT_TRAIN_BATCH_SIZE, DEFAULT_TRAIN_EPOCHS, DEFAULT_TRAIN_LEARNING_RATE, FinetuneConfig,
    ProcessJobRunner, TriggerConfig,
};

/// Solver configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `GLIMPSE_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Attempt store root. Default: `captcha_learning`.
    pub store_path: PathBuf,

    /// Pretrained CLIP directory. Default: `models/clip-base`.
    pub baseline_model: PathBuf,

    /// Fine-tuned CLIP directory. Default: `models/clip-finetuned`.
    pub finetuned_model: PathBuf,

    /// Use the deterministic stub instead of a baseline checkpoint. Default: `false`.
    pub stub_model: bool,

    /// Allow the fine-tuned variant to be selected. Default: `true`.
    pub use_finetuned: bool,

    /// Compute device preference. Default: `auto`.
    pub device: DevicePreference,

    /// Points above the random baseline required to trust a guess. Default: `10`.
    pub conf_margin_abs: f32,

    /// Points between best and runner-up required to trust a guess. Default: `5`.
    pub conf_margin_rel: f32,

    /// Re-check weak fine-tuned results with the baseline. Default: `true`.
    pub fallback_enabled: bool,

    /// Fine-tuned best score below which the baseline is consulted. Default: `60`.
    pub fallback_min_confidence: f32,

    /// Fine-tuned margin below which the baseline is consulted. Default: `8`.
    pub fallback_min_margin: f32,

    /// New labels before retraining. Default: `20`.
    pub training_label_threshold: u64,

    /// Minimum time between retraining launches. Default: one hour.
    pub training_min_interval: Duration,

    /// Consecutive failures before switching variant. Default: `5`.
    pub switch_failure_threshold: u32,

    /// Fine-tuning epochs. Default: `10`.
    pub train_epochs: usize,

    /// Fine-tuning batch size. Default: `4`.
    pub train_batch_size: usize,

    /// Fine-tuning learning rate. Default: `1e-5`.
    pub train_learning_rate: f64,

    /// Program started for retraining. Default: unset, meaning the `glimpse` binary next to
    /// the running executable, else `glimpse` on `PATH`.
    pub train_program: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            baseline_model: PathBuf::from(DEFAULT_BASELINE_MODEL_DIR),
            finetuned_model: PathBuf::from(DEFAULT_FINETUNED_MODEL_DIR),
            stub_model: false,
            use_finetuned: true,
            device: DevicePreference::Auto,
            conf_margin_abs: DEFAULT_CONF_MARGIN_ABS,
            conf_margin_rel: DEFAULT_CONF_MARGIN_REL,
            fallback_enabled: true,
            fallback_min_confidence: DEFAULT_FALLBACK_MIN_CONFIDENCE,
            fallback_min_margin: DEFAULT_FALLBACK_MIN_MARGIN,
            training_label_threshold: DEFAULT_TRAINING_LABEL_THRESHOLD,
            training_min_interval: Duration::from_secs(DEFAULT_TRAINING_MIN_INTERVAL_SECS),
            switch_failure_threshold: DEFAULT_SWITCH_FAILURE_THRESHOLD,
            train_epochs: DEFAULT_TRAIN_EPOCHS,
            train_batch_size: DEFAULT_TRAIN_BATCH_SIZE,
            train_learning_rate: DEFAULT_TRAIN_LEARNING_RATE,
            train_program: None,
        }
    }
}

impl Config {
    const ENV_STORE_PATH: &'static str = "GLIMPSE_STORE_PATH";
    const ENV_BASELINE_MODEL: &'static str = "GLIMPSE_BASELINE_MODEL";
    const ENV_FINETUNED_MODEL: &'static str = "GLIMPSE_FINETUNED_MODEL";
    const ENV_STUB_MODEL: &'static str = "GLIMPSE_STUB_MODEL";
    const ENV_USE_FINETUNED: &'static str = "GLIMPSE_USE_FINETUNED";
    const ENV_DEVICE: &'static str = "GLIMPSE_DEVICE";
    const ENV_CONF_MARGIN_ABS: &'static str = "GLIMPSE_CONF_MARGIN_ABS";
    const ENV_CONF_MARGIN_REL: &'static str = "GLIMPSE_CONF_MARGIN_REL";
    const ENV_FALLBACK_ENABLED: &'static str = "GLIMPSE_FALLBACK_ENABLED";
    const ENV_FALLBACK_MIN_CONFIDENCE: &'static str = "GLIMPSE_FALLBACK_MIN_CONFIDENCE";
    const ENV_FALLBACK_MIN_MARGIN: &'static str = "GLIMPSE_FALLBACK_MIN_MARGIN";
    const ENV_TRAINING_LABEL_THRESHOLD: &'static str = "GLIMPSE_TRAINING_LABEL_THRESHOLD";
    const ENV_TRAINING_MIN_INTERVAL_SECS: &'static str = "GLIMPSE_TRAINING_MIN_INTERVAL_SECS";
    const ENV_SWITCH_FAILURE_THRESHOLD: &'static str = "GLIMPSE_SWITCH_FAILURE_THRESHOLD";
    const ENV_TRAIN_EPOCHS: &'static str = "GLIMPSE_TRAIN_EPOCHS";
    const ENV_TRAIN_BATCH_SIZE: &'static str = "GLIMPSE_TRAIN_BATCH_SIZE";
    const ENV_TRAIN_LEARNING_RATE: &'static str = "GLIMPSE_TRAIN_LEARNING_RATE";
    const ENV_TRAIN_PROGRAM: &'static str = "GLIMPSE_TRAIN_PROGRAM";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let device = match Self::parse_optional_string_from_env(Self::ENV_DEVICE) {
            Some(value) => DevicePreference::from_str(&value)
                .map_err(|_| ConfigError::InvalidDevice { value })?,
            None => defaults.device,
        };

        let training_min_interval = Duration::from_secs(Self::parse_number_from_env(
            Self::ENV_TRAINING_MIN_INTERVAL_SECS,
            defaults.training_min_interval.as_secs(),
        )?);

        Ok(Self {
            store_path: Self::parse_path_from_env(Self::ENV_STORE_PATH, defaults.store_path),
            baseline_model: Self::parse_path_from_env(
                Self::ENV_BASELINE_MODEL,
                defaults.baseline_model,
            ),
            finetuned_model: Self::parse_path_from_env(
                Self::ENV_FINETUNED_MODEL,
                defaults.finetuned_model,
            ),
            stub_model: Self::parse_bool_from_env(Self::ENV_STUB_MODEL, defaults.stub_model)?,
            use_finetuned: Self::parse_bool_from_env(
                Self::ENV_USE_FINETUNED,
                defaults.use_finetuned,
            )?,
            device,
            conf_margin_abs: Self::parse_number_from_env(
                Self::ENV_CONF_MARGIN_ABS,
                defaults.conf_margin_abs,
            )?,
            conf_margin_rel: Self::parse_number_from_env(
                Self::ENV_CONF_MARGIN_REL,
                defaults.conf_margin_rel,
            )?,
            fallback_enabled: Self::parse_bool_from_env(
                Self::ENV_FALLBACK_ENABLED,
                defaults.fallback_enabled,
            )?,
            fallback_min_confidence: Self::parse_number_from_env(
                Self::ENV_FALLBACK_MIN_CONFIDENCE,
                defaults.fallback_min_confidence,
            )?,
            fallback_min_margin: Self::parse_number_from_env(
                Self::ENV_FALLBACK_MIN_MARGIN,
                defaults.fallback_min_margin,
            )?,
            training_label_threshold: Self::parse_number_from_env(
                Self::ENV_TRAINING_LABEL_THRESHOLD,
                defaults.training_label_threshold,
            )?,
            training_min_interval,
            switch_failure_threshold: Self::parse_number_from_env(
                Self::ENV_SWITCH_FAILURE_THRESHOLD,
                defaults.switch_failure_threshold,
            )?,
            train_epochs: Self::parse_number_from_env(Self::ENV_TRAIN_EPOCHS, defaults.train_epochs)?,
            train_batch_size: Self::parse_number_from_env(
                Self::ENV_TRAIN_BATCH_SIZE,
                defaults.train_batch_size,
            )?,
            train_learning_rate: Self::parse_number_from_env(
                Self::ENV_TRAIN_LEARNING_RATE,
                defaults.train_learning_rate,
            )?,
            train_program: Self::parse_optional_string_from_env(Self::ENV_TRAIN_PROGRAM)
                .map(PathBuf::from),
        })
    }

    /// Validates ranges and paths (does not create directories or require model files).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_path.exists() && !self.store_path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.store_path.clone(),
            });
        }

        for path in [&self.baseline_model, &self.finetuned_model] {
            if path.exists() && !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }
        if let Some(program) = self.train_program.as_ref().filter(|p| p.is_dir()) {
            return Err(ConfigError::NotAFile {
                path: program.clone(),
            });
        }
        if self.baseline_model == self.finetuned_model {
            return Err(ConfigError::SharedModelDir {
                path: self.baseline_model.clone(),
            });
        }

        let percentages = [
            ("conf_margin_abs", self.conf_margin_abs),
            ("conf_margin_rel", self.conf_margin_rel),
            ("fallback_min_confidence", self.fallback_min_confidence),
            ("fallback_min_margin", self.fallback_min_margin),
        ];
        for (name, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name,
                    reason: format!("{value} is not a percentage in 0..=100"),
                });
            }
        }

        let positive = [
            ("training_label_threshold", self.training_label_threshold),
            ("switch_failure_threshold", u64::from(self.switch_failure_threshold)),
            ("train_epochs", self.train_epochs as u64),
            ("train_batch_size", self.train_batch_size as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::OutOfRange {
                    name,
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        if !(self.train_learning_rate.is_finite() && self.train_learning_rate > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "train_learning_rate",
                reason: format!("{} is not a positive number", self.train_learning_rate),
            });
        }

        Ok(())
    }

    /// Gate and fallback thresholds for the solver.
    pub fn solver_config(&self) -> SolverConfig {
        let fallback = if self.fallback_enabled {
            FallbackConfig {
                enabled: true,
                min_confidence: self.fallback_min_confidence,
                min_margin: self.fallback_min_margin,
            }
        } else {
            FallbackConfig::disabled()
        };

        SolverConfig {
            gate: GateConfig::new(self.conf_margin_abs, self.conf_margin_rel),
            fallback,
        }
    }

    /// Variant switching policy.
    pub fn selection_config(&self) -> SelectionConfig {
        SelectionConfig::default()
            .with_failure_threshold(self.switch_failure_threshold)
            .with_use_finetuned(self.use_finetuned)
    }

    /// Retraining launch conditions.
    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig::default()
            .with_label_threshold(self.training_label_threshold)
            .with_min_interval(self.training_min_interval)
    }

    /// Everything a [`LearningSession`](crate::session::LearningSession) needs besides I/O.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            solver: self.solver_config(),
            selection: self.selection_config(),
            trigger: self.trigger_config(),
        }
    }

    /// Fine-tuning job settings: start from the baseline, write the fine-tuned checkpoint.
    pub fn finetune_config(&self) -> FinetuneConfig {
        FinetuneConfig {
            baseline_dir: self.baseline_model.clone(),
            output_dir: self.finetuned_model.clone(),
            epochs: self.train_epochs,
            batch_size: self.train_batch_size,
            learning_rate: self.train_learning_rate,
            device: self.device,
        }
    }

    /// Runner that starts the configured training program.
    pub fn job_runner(&self) -> ProcessJobRunner {
        ProcessJobRunner::resolve(self.train_program.as_deref())
    }

    /// Model loader for both variants.
    pub fn model_loader(&self) -> ClipModelLoader {
        let baseline = if self.stub_model {
            ClipModelConfig::stub()
        } else {
            ClipModelConfig::new(&self.baseline_model).with_device(self.device)
        };
        let finetuned = ClipModelConfig::new(&self.finetuned_model).with_device(self.device);
        ClipModelLoader::new(baseline, finetuned)
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        Self::parse_optional_string_from_env(var_name)
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_number_from_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::parse_optional_string_from_env(name) {
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidNumber {
                name,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }

    fn parse_bool_from_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match Self::parse_optional_string_from_env(name) {
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidBool { name, value }),
            },
            None => Ok(default),
        }
    }
}
