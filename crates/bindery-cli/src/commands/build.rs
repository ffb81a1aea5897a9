//! `bindery build`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bindery_bundler::{BuildOutput, Bundler, FsAnalyzer, NativeRuntime, Runtime, WrittenFiles};
use tracing::{info, warn};

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::config::{BinderyConfig, ConfigOverrides};
use crate::error::{CliError, Result};

/// What a build produced and where it went.
#[derive(Debug)]
pub struct BuildSummary {
    pub output: BuildOutput,
    pub written: WrittenFiles,
    pub out_dir: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

/// Execute the build command.
///
/// 1. Load and validate configuration (flags > env > file > defaults)
/// 2. Discover dependencies and assign bundles
/// 3. Build every bundle
/// 4. Write bundles, copy passthrough files, optionally write the manifest
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();
    let cwd = std::env::current_dir()?;

    let config = BinderyConfig::load(
        &ConfigOverrides::from(&args),
        args.project.config.as_deref(),
        &cwd,
    )?;
    config.validate()?;

    let summary = run(&config, &cwd).await?;
    info!(
        "Wrote {} bundle(s) and copied {} file(s) to {} in {}",
        summary.written.bundles.len(),
        summary.written.copied.len(),
        summary.out_dir.display(),
        utils::format_duration(start_time.elapsed())
    );
    if !summary.output.missing.is_empty() {
        warn!(
            "{} import(s) could not be found and were left as links",
            summary.output.missing.len()
        );
    }
    Ok(())
}

/// Build with an already validated configuration. Relative paths in
/// `config` resolve against `cwd`.
pub async fn run(config: &BinderyConfig, cwd: &Path) -> Result<BuildSummary> {
    let root = utils::resolve_path(&config.root, cwd);
    utils::validate_root(&root)?;
    let out_dir = utils::resolve_path(&config.out_dir, cwd);
    validate_output_dir(&out_dir, &root, cwd)?;

    let options = config.bundler_options()?;
    let strategy = config.bundle_strategy()?;
    let entrypoints = config.entrypoint_urls();

    let runtime = Arc::new(NativeRuntime::new());
    let analyzer = Arc::new(FsAnalyzer::new(runtime.clone(), root.clone()));

    if entrypoints.len() == 1 {
        info!("Building {}", entrypoints[0]);
    } else {
        info!("Building {} entrypoints", entrypoints.len());
    }
    let output = Bundler::new(analyzer, options)
        .build(&entrypoints, strategy.as_ref())
        .await?;
    for url in &output.missing {
        warn!(url = %url, "missing import");
    }

    utils::ensure_output_dir(&out_dir)?;
    let written = output.write_to(runtime.as_ref(), &root, &out_dir).await?;
    for bundle in &output.bundles {
        info!("  {} ({} files)", bundle.url, bundle.bundle.files.len());
    }

    let manifest_path = match &config.manifest_out {
        Some(path) => {
            let path = utils::resolve_path(path, cwd);
            let json = serde_json::to_string_pretty(&output.manifest.to_json())?;
            runtime
                .write_file(&path, json.as_bytes())
                .await
                .map_err(bindery_graph::Error::from)?;
            info!("Manifest written to {}", path.display());
            Some(path)
        }
        None => None,
    };

    Ok(BuildSummary {
        output,
        written,
        out_dir,
        manifest_path,
    })
}

/// The output directory must not be the project root or contain it, and
/// must lie inside the working directory or next to it.
fn validate_output_dir(out_dir: &Path, root: &Path, cwd: &Path) -> Result<()> {
    let not_writable = || CliError::OutputNotWritable(out_dir.to_path_buf());

    let canonical_out = if out_dir.exists() {
        out_dir.canonicalize()?
    } else {
        // The nearest existing ancestor decides where the new directory lands.
        let mut existing = out_dir;
        let mut missing = Vec::new();
        while !existing.exists() {
            missing.push(existing.file_name().ok_or_else(not_writable)?);
            existing = existing.parent().ok_or_else(not_writable)?;
        }
        let mut canonical = existing.canonicalize()?;
        canonical.extend(missing.into_iter().rev());
        canonical
    };
    let canonical_root = root.canonicalize()?;
    let canonical_cwd = cwd.canonicalize()?;

    if canonical_root.starts_with(&canonical_out) {
        return Err(not_writable());
    }

    let is_within_project = canonical_out.starts_with(&canonical_cwd);
    let is_sibling = canonical_out
        .parent()
        .and_then(|p| canonical_cwd.parent().map(|c| p == c))
        .unwrap_or(false);
    if !is_within_project && !is_sibling {
        return Err(not_writable());
    }
    Ok(())
}
