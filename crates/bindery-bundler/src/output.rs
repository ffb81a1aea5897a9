//! Writing a build to disk.
//!
//! Bundles are written to `out_dir` at the path of their url, passthrough
//! files are copied from the project root to the same relative location, so
//! relative references between them keep working. Every target path is
//! checked to stay inside `out_dir`.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::debug;

use bindery_graph::{ResolvedUrl, Runtime};

use crate::bundler::BuildOutput;
use crate::error::{BundleError, Result};

/// Paths written by [`BuildOutput::write_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenFiles {
    pub bundles: Vec<PathBuf>,
    pub copied: Vec<PathBuf>,
}

/// Target path of `url` below `out_dir`. Urls with a scheme, or whose path
/// would leave `out_dir`, are rejected.
pub fn output_path(out_dir: &Path, url: &ResolvedUrl) -> Result<PathBuf> {
    let invalid = |reason: &str| BundleError::InvalidOutputPath {
        url: url.clone(),
        reason: reason.to_string(),
    };

    let path = url.as_str().split(['?', '#']).next().unwrap_or_default();
    if path.contains('\0') {
        return Err(invalid("contains a null byte"));
    }
    let relative = path
        .strip_prefix('/')
        .filter(|rest| !rest.starts_with('/'))
        .ok_or_else(|| invalid("not a root-absolute path"))?;
    if relative.is_empty() || relative.ends_with('/') {
        return Err(invalid("names a directory"));
    }

    let out_dir = out_dir.clean();
    let target = out_dir.join(relative.replace("%20", " ")).clean();
    if !target.starts_with(&out_dir) {
        return Err(invalid("escapes the output directory"));
    }
    Ok(target)
}

impl BuildOutput {
    /// Write every bundle and copy every passthrough file from `root`.
    pub async fn write_to(
        &self,
        runtime: &dyn Runtime,
        root: &Path,
        out_dir: &Path,
    ) -> Result<WrittenFiles> {
        let mut written = WrittenFiles::default();

        for output in &self.bundles {
            let target = output_path(out_dir, &output.url)?;
            runtime
                .write_file(&target, output.content.as_bytes())
                .await
                .map_err(|err| BundleError::Write {
                    path: target.clone(),
                    reason: err.to_string(),
                })?;
            debug!(url = %output.url, path = %target.display(), "wrote bundle");
            written.bundles.push(target);
        }

        for url in &self.passthrough {
            let source = output_path(root, url)?;
            let target = output_path(out_dir, url)?;
            if source == target {
                continue;
            }
            let bytes = runtime
                .read_file(&source)
                .await
                .map_err(|err| BundleError::Write {
                    path: source.clone(),
                    reason: err.to_string(),
                })?;
            runtime
                .write_file(&target, &bytes)
                .await
                .map_err(|err| BundleError::Write {
                    path: target.clone(),
                    reason: err.to_string(),
                })?;
            debug!(url = %url, path = %target.display(), "copied");
            written.copied.push(target);
        }

        Ok(written)
    }
}
