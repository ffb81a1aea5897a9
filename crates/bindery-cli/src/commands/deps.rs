//! `bindery deps`: dependency discovery only, printed as JSON.

use std::path::Path;
use std::sync::Arc;

use bindery_bundler::{DepsIndex, FsAnalyzer, NativeRuntime, build_deps_index};
use tracing::debug;

use crate::cli::DepsArgs;
use crate::commands::utils;
use crate::config::{BinderyConfig, ConfigOverrides};
use crate::error::Result;

pub async fn execute(args: DepsArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = BinderyConfig::load(
        &ConfigOverrides::from(&args),
        args.project.config.as_deref(),
        &cwd,
    )?;
    config.validate()?;

    let deps = discover(&config, &cwd).await?;
    println!("{}", serde_json::to_string_pretty(&deps.to_json())?);
    Ok(())
}

/// Build the dependency index of the configured entrypoints.
pub async fn discover(config: &BinderyConfig, cwd: &Path) -> Result<DepsIndex> {
    let root = utils::resolve_path(&config.root, cwd);
    utils::validate_root(&root)?;
    let excludes = config.exclude_patterns()?;

    let analyzer = FsAnalyzer::new(Arc::new(NativeRuntime::new()), root);
    let deps = build_deps_index(&config.entrypoint_urls(), &analyzer, &excludes)
        .await
        .map_err(bindery_graph::Error::from)?;
    debug!(entrypoints = deps.len(), "discovery finished");
    Ok(deps)
}
