//! Error types for the bindery CLI.
//!
//! `CliError` is what commands return; library errors convert into it via
//! `#[from]`. Configuration problems get their own [`ConfigError`] so they
//! can carry a hint. [`cli_error_to_miette`] renders either for the terminal.

mod miette;

use std::path::PathBuf;
use thiserror::Error;

use bindery_bundler::BundleError;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Discovery or assignment failed
    #[error(transparent)]
    Graph(#[from] bindery_graph::Error),

    /// Building or writing bundles failed
    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output directory is not writable: {}", .0.display())]
    OutputNotWritable(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors. Every variant names what to change.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}\n\nHint: Create a bindery.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// figment could not read or merge a source
    #[error("Failed to load configuration: {0}\n\nHint: Check bindery.config.json syntax and BINDERY_* variables")]
    Load(String),

    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField { field: String, hint: String },

    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    #[error("Conflicting options: {0}")]
    ConflictingOptions(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;
