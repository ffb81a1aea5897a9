//! Bindery CLI - links HTML imports, scripts and styles into bundles.
//!
//! # Architecture
//!
//! - [`cli`] - clap argument definitions
//! - [`config`] - `bindery.config.json` / `BINDERY_*` / flag layering via figment
//! - [`commands`] - `build` and `deps`
//! - [`error`] - error types and miette rendering
//! - [`logger`] - tracing subscriber setup
//!
//! # Example
//!
//! ```rust,no_run
//! use bindery_cli::{config::BinderyConfig, commands::build};
//!
//! # async fn run() -> bindery_cli::Result<()> {
//! let cwd = std::env::current_dir()?;
//! let config = BinderyConfig {
//!     entrypoints: vec!["index.html".to_string()],
//!     ..BinderyConfig::default()
//! };
//! config.validate()?;
//! let summary = build::run(&config, &cwd).await?;
//! println!("{} bundles", summary.output.bundles.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;

pub use error::{CliError, ConfigError, Result};
