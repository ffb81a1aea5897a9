//! Filesystem-backed runtime.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::task;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Runtime that reads and writes the real filesystem. Blocking `std::fs`
/// calls run on tokio's blocking pool.
#[derive(Debug, Clone, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> RuntimeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(format!("Failed to {} {}: {}", action, path.display(), err))
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();
        task::spawn_blocking(move || std::fs::read(&path).map_err(|e| io_error("read", &path, e)))
            .await
            .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        let content = content.to_vec();
        task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
            }
            std::fs::write(&path, content).map_err(|e| io_error("write", &path, e))
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn create_dir(&self, path: &Path) -> RuntimeResult<()> {
        let path = path.to_path_buf();
        task::spawn_blocking(move || {
            std::fs::create_dir_all(&path).map_err(|e| io_error("create", &path, e))
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        std::env::current_dir()
            .map_err(|e| RuntimeError::Io(format!("Failed to get current directory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_create_parent_directories() {
        let temp = tempfile::tempdir().unwrap();
        let runtime = NativeRuntime::new();
        let path = temp.path().join("nested/dir/out.html");

        runtime.write_file(&path, b"<p>hi</p>").await.unwrap();

        assert!(runtime.exists(&path));
        assert_eq!(runtime.read_file(&path).await.unwrap(), b"<p>hi</p>");
    }

    #[tokio::test]
    async fn missing_file_is_reported_as_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let runtime = NativeRuntime::new();
        let err = runtime
            .read_file(&temp.path().join("nope.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::FileNotFound(_)));
    }
}
