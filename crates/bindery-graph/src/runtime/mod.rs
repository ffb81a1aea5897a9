//! Platform runtime abstraction.
//!
//! Every file the analyzer loads and every bundle the CLI writes goes through
//! a [`Runtime`]. [`native::NativeRuntime`] talks to the real filesystem;
//! [`memory::MemoryRuntime`] keeps virtual files for tests.

#[cfg(not(target_family = "wasm"))]
pub mod native;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// Platform runtime trait
///
/// On wasm targets the returned futures are not `Send`; the trait itself keeps
/// `Send + Sync` so it can always live behind an `Arc<dyn Runtime>`.
#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file from the filesystem
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Write a file, creating missing parent directories
    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory (and its parents)
    async fn create_dir(&self, path: &Path) -> RuntimeResult<()>;

    /// Get the current working directory
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}

/// Read a file and decode it as UTF-8, replacing invalid sequences.
pub async fn read_to_string(runtime: &dyn Runtime, path: &Path) -> RuntimeResult<String> {
    let bytes = runtime.read_file(path).await?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}
