//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Default)]
struct State {
    files: HashMap<PathBuf, Vec<u8>>,
    directories: HashSet<PathBuf>,
    denied: Vec<PathBuf>,
    writes: usize,
}
impl State {
    fn is_denied(&self, path: &Path) -> bool {
        self.denied.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// In-memory storage backend for testing.
///
/// Files live in a `HashMap` behind a [`RwLock`], so trait methods work on
/// `&self`. Directories are tracked separately so that
/// [`create_dir`](StorageBackend::create_dir) semantics (idempotent, fails
/// over a file) match [`LocalBackend`](super::LocalBackend).
///
/// Operations normally complete on their first poll. [`yielding`](Self::yielding)
/// makes each one suspend once first, like a real filesystem would, so
/// concurrent callers actually interleave.
///
/// Only compiled with the `mock` feature (or in this crate's own tests).
///
/// ```ignore
/// use mdlocal_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("notes/today.md", b"![](https://x/y.png)")]);
/// assert!(backend.exists(Path::new("notes/today.md")).await?);
/// backend.write(Path::new("media/y.png"), b"\x89PNG").await?;
/// assert!(backend.exists(Path::new("media/y.png")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    state: RwLock<State>,
    yielding: bool,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation; broken test setup should not
    /// produce a passing test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut state = State::default();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            state.files.insert(validated, data.into());
        }
        Self { state: RwLock::new(state), yielding: false }
    }

    /// Suspend once at the start of every `exists`, `read` and `write`.
    pub fn yielding(mut self) -> Self {
        self.yielding = true;
        self
    }

    /// Make every write below `prefix` fail with
    /// [`PermissionDenied`](ErrorKind::PermissionDenied).
    pub fn deny_writes(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.state.get_mut().denied.push(prefix.into());
        self
    }

    /// Number of successful [`write`](StorageBackend::write) calls so far.
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    /// Snapshot of a file's contents, for assertions.
    pub async fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = validate_path(path.as_ref()).ok()?;
        self.state.read().await.files.get(&path).cloned()
    }

    async fn pause(&self) {
        if self.yielding {
            tokio::task::yield_now().await;
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot under the read lock; never hold it across a yield.
            let mut entries: Vec<PathBuf> = {
                let guard = self.state.read().await;
                guard
                    .files
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .filter(|(path, _)| !path.components().any(|c| super::is_hidden(c.as_os_str())))
                    .map(|(path, _)| path.clone())
                    .collect()
            };
            // Deterministic order keeps tests stable.
            entries.sort();
            for path in entries {
                yield Ok(FileInfo::new(path));
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        self.pause().await;
        let guard = self.state.read().await;
        Ok(guard.files.contains_key(&path) || guard.directories.contains(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        self.pause().await;
        let data = self.state.read().await.files.get(&path).cloned();
        data.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.pause().await;
        let mut guard = self.state.write().await;
        if guard.is_denied(&path) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        if guard.directories.contains(&path) {
            exn::bail!(ErrorKind::BackendError(format!("`{}` is a directory", path.display())));
        }
        guard.files.insert(path, data.to_vec());
        guard.writes += 1;
        Ok(())
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        let mut guard = self.state.write().await;
        if guard.files.contains_key(&path) {
            exn::bail!(ErrorKind::NotADirectory(path));
        }
        guard.directories.insert(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new("media/cat.png"), b"meow").await.unwrap();
        assert_eq!(backend.read(Path::new("media/cat.png")).await.unwrap(), b"meow");
        assert_eq!(backend.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing.md")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_dir() {
        let backend = MockBackend::with_files([("media", b"a file".to_vec())]);
        backend.create_dir(Path::new("attachments")).await.unwrap();
        backend.create_dir(Path::new("attachments")).await.unwrap();
        assert!(backend.exists(Path::new("attachments")).await.unwrap());
        let err = backend.create_dir(Path::new("media")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_denied_writes() {
        let backend = MockBackend::default().deny_writes("media");
        let err = backend.write(Path::new("media/cat.png"), b"meow").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        backend.write(Path::new("notes/ok.md"), b"fine").await.unwrap();
        assert_eq!(backend.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_list_with_prefix_sorted() {
        let backend = MockBackend::with_files([
            ("notes/b.md", Vec::from(*b"b")),
            ("notes/a.md", Vec::from(*b"a")),
            ("media/c.png", Vec::from(*b"c")),
            (".obsidian/app.json", Vec::from(*b"{}")),
        ]);
        let paths: Vec<_> = backend.list(Some(Path::new("notes"))).await.unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec![PathBuf::from("notes/a.md"), PathBuf::from("notes/b.md")]);
        assert_eq!(backend.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_yielding_operations_interleave() {
        async fn check_then_write(backend: &MockBackend, data: &[u8]) -> bool {
            let path = Path::new("media/cat.png");
            let existed = backend.exists(path).await.unwrap();
            backend.write(path, data).await.unwrap();
            existed
        }

        let eager = MockBackend::default();
        let (first, second) = tokio::join!(check_then_write(&eager, b"one"), check_then_write(&eager, b"two"));
        assert_eq!((first, second), (false, true));

        // Both checks run before either write lands.
        let yielding = MockBackend::default().yielding();
        let (first, second) = tokio::join!(check_then_write(&yielding, b"one"), check_then_write(&yielding, b"two"));
        assert_eq!((first, second), (false, false));
        assert_eq!(yielding.write_count().await, 2);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape"), b"bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
