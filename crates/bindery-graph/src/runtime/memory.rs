//! In-memory runtime for tests.
//!
//! Files live in a map keyed by normalized absolute path. Relative paths are
//! resolved against the virtual working directory, so `./a.html` and
//! `/project/a.html` name the same file when the cwd is `/project`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use super::{Runtime, RuntimeError, RuntimeResult};

#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    cwd: PathBuf,
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryRuntime {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            files: Arc::new(RwLock::new(FxHashMap::default())),
        }
    }

    /// Build a runtime pre-populated with `(path, contents)` pairs.
    pub fn with_files<'a>(
        cwd: impl Into<PathBuf>,
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let runtime = Self::new(cwd);
        for (path, contents) in files {
            runtime.add_file(path, contents);
        }
        runtime
    }

    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let key = self.normalize(path.as_ref());
        self.files.write().insert(key, contents.into());
    }

    /// Contents of a file as UTF-8, if present.
    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        let key = self.normalize(path.as_ref());
        self.files
            .read()
            .get(&key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Sorted paths of every stored file.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let key = self.normalize(path);
        self.files
            .read()
            .get(&key)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(key))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let key = self.normalize(path);
        self.files.write().insert(key, content.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let key = self.normalize(path);
        let files = self.files.read();
        files.contains_key(&key) || files.keys().any(|file| file.starts_with(&key))
    }

    async fn create_dir(&self, _path: &Path) -> RuntimeResult<()> {
        Ok(())
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn relative_and_absolute_paths_share_storage() {
        let runtime = MemoryRuntime::with_files("/project", [("a.html", "<p>a</p>")]);
        assert_eq!(
            runtime.read_file(Path::new("/project/a.html")).await.unwrap(),
            b"<p>a</p>"
        );
        assert_eq!(
            runtime.read_file(Path::new("./sub/../a.html")).await.unwrap(),
            b"<p>a</p>"
        );
        assert!(runtime.exists(Path::new("/project")));
        assert!(!runtime.exists(Path::new("/other")));
    }

    #[tokio::test]
    async fn writes_are_visible() {
        let runtime = MemoryRuntime::new("/");
        runtime
            .write_file(Path::new("/out/x.js"), b"x()")
            .await
            .unwrap();
        assert_eq!(runtime.file("/out/x.js").as_deref(), Some("x()"));
        assert_eq!(runtime.paths(), vec![PathBuf::from("/out/x.js")]);
    }
}
