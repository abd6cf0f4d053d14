//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {reason}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A boolean variable was not one of the accepted spellings.
    #[error("invalid boolean {name}='{value}': expected true/false, 1/0, yes/no or on/off")]
    InvalidBool { name: &'static str, value: String },

    /// `GLIMPSE_DEVICE` named an unknown device.
    #[error("invalid device '{value}': expected 'auto' or 'cpu'")]
    InvalidDevice { value: String },

    /// A value parsed but is outside its allowed range.
    #[error("{name} out of range: {reason}")]
    OutOfRange { name: &'static str, reason: String },

    /// Baseline and fine-tuned models point at the same directory.
    #[error("baseline and fine-tuned models share a directory: {path}")]
    SharedModelDir { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Path is a directory where a program was expected.
    #[error("path is a directory, expected a program: {path}")]
    NotAFile { path: PathBuf },
}
