//! Shared utilities for command implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CliError, Result};

/// Resolve `path` against `cwd` unless it is absolute.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// The project root must be an existing directory.
pub fn validate_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Project root is not a directory: {}",
            root.display()
        )));
    }
    Ok(())
}

/// Create `out_dir` if needed.
pub fn ensure_output_dir(out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        fs::create_dir_all(out_dir)?;
    } else if !out_dir.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Output path exists but is not a directory: {}",
            out_dir.display()
        )));
    }
    Ok(())
}

/// `850ms`, `1.24s`
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
