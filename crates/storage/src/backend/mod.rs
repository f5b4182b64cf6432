//! Storage backend trait and implementations.
//!
//! The [`StorageBackend`] trait is the binary-storage collaborator of the
//! media pipeline: existence checks, whole-file reads and writes, directory
//! creation, and recursive listing for bulk document discovery.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for vault storage.
///
/// All operations are asynchronous; the pipeline interleaves many of them
/// while fetching images for a single document.
///
/// # Path Handling
/// All paths are relative to the vault root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mdlocal_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_note(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("notes/today.md");
///     if backend.exists(path).await? {
///         Ok(backend.read(path).await?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream metadata for every file below an optional prefix.
    ///
    /// Hidden entries (names starting with `.`, such as editor configuration
    /// directories) are not listed.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use mdlocal_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("notes")));
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}", info.path.display());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file or directory exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or overwriting the file.
    ///
    /// Implementations create parent directories as needed.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use mdlocal_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.write(Path::new("media/cat.png"), b"\x89PNG...").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Create a directory (and its parents).
    ///
    /// Idempotent: an existing directory is success. A *file* at the same
    /// path is [`NotADirectory`](crate::error::ErrorKind::NotADirectory).
    async fn create_dir(&self, path: &Path) -> Result<()>;
}

/// Returns `true` for dotfiles and dot-directories.
pub(crate) fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}
