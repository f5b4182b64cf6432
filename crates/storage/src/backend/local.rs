//! Local filesystem storage backend.
//!
//! Stores the vault in a directory on the local filesystem, using
//! `tokio::fs` for async I/O.

use crate::backend::{FileInfoStream, is_hidden};
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured vault root.
///
/// ```no_run
/// use mdlocal_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("vault", "/home/me/notes")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or points at something other than a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Constructor runs once at startup; not worth making it async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// The absolute vault root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates a relative path and joins it onto the root.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Converts an absolute path below the root back into a vault path.
    ///
    /// Public so that filesystem watchers, which report absolute paths, can
    /// translate events into documents.
    pub fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!("expected an absolute path, got `{}`", absolute.display())));
        }
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("`{}` is outside the vault `{}`", absolute.display(), self.root.display()))
        })?;
        validate_path(relative)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::NotADirectory => {
                ErrorKind::NotADirectory(path.to_path_buf())
            },
            _ => ErrorKind::Io(e),
        }
    }

    /// Classifies a single directory entry so the listing stream only has to
    /// deal with one error type per entry.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        if is_hidden(&entry.file_name()) {
            return Ok(WalkEntry::Skip);
        }
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_path(&path)?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(FileInfo::new(relative)));
        }
        // Broken symlinks and special files are not part of the vault.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };
        let start_dir = validated_prefix
            .as_ref()
            .map(|prefix| self.root.join(prefix))
            .filter(|dir| dir.is_dir())
            .unwrap_or_else(|| self.root.clone());
        let mut stack = vec![start_dir];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A directory that vanished mid-walk lists as empty.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        tracing::trace!(backend = %self.name, path = %path.display(), bytes = data.len(), "Writing file");
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if abs_path.is_file() {
            exn::bail!(ErrorKind::NotADirectory(path.to_path_buf()));
        }
        Ok(fs::create_dir_all(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("vault", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("vault", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("vault", "relative/notes").is_err());
        assert!(LocalBackend::new("vault", "./notes").is_err());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("note.md");
        std::fs::write(&file, "# hi").unwrap();
        assert!(LocalBackend::new("vault", &file).is_err());
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let (temp_dir, backend) = backend();
        let expected = temp_dir.path().join("media/cat.png");
        assert_eq!(backend.absolute_path(Path::new("media/cat.png")).unwrap(), expected);
        assert_eq!(backend.relative_path(&expected).unwrap(), Path::new("media/cat.png"));
        assert!(backend.absolute_path(Path::new("../escape.md")).is_err());
        assert!(backend.relative_path(Path::new("/somewhere/else.md")).is_err());
        assert!(backend.relative_path(Path::new("relative.md")).is_err());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("media/cat.png"), b"meow").await.unwrap();
        assert_eq!(backend.read(Path::new("media/cat.png")).await.unwrap(), b"meow");
    }

    #[tokio::test]
    async fn test_read_missing() {
        let (_temp_dir, backend) = backend();
        let err = backend.read(Path::new("nope.md")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_exists() {
        let (_temp_dir, backend) = backend();
        assert!(!backend.exists(Path::new("note.md")).await.unwrap());
        backend.write(Path::new("note.md"), b"text").await.unwrap();
        assert!(backend.exists(Path::new("note.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_dir_is_idempotent() {
        let (temp_dir, backend) = backend();
        backend.create_dir(Path::new("media/nested")).await.unwrap();
        backend.create_dir(Path::new("media/nested")).await.unwrap();
        assert!(temp_dir.path().join("media/nested").is_dir());
    }

    #[tokio::test]
    async fn test_create_dir_over_file() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("media"), b"not a folder").await.unwrap();
        let err = backend.create_dir(Path::new("media")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_list_skips_hidden_entries() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("a.md"), b"a").await.unwrap();
        backend.write(Path::new("notes/b.md"), b"b").await.unwrap();
        backend.write(Path::new(".obsidian/workspace.json"), b"{}").await.unwrap();
        backend.write(Path::new(".hidden.md"), b"c").await.unwrap();
        let mut paths: Vec<_> = backend.list(None).await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("a.md"), PathBuf::from("notes/b.md")]);
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("notes/a.md"), b"a").await.unwrap();
        backend.write(Path::new("notes/deep/b.md"), b"b").await.unwrap();
        backend.write(Path::new("notesextra/c.md"), b"c").await.unwrap();
        let files = backend.list(Some(Path::new("notes"))).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.path.starts_with("notes")));
    }

    #[tokio::test]
    async fn test_list_nonexistent_prefix() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("a.md"), b"a").await.unwrap();
        assert!(backend.list(Some(Path::new("missing"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_temp_dir, backend) = backend();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("media/../../escape.png"), b"x").await.is_err());
        assert!(backend.create_dir(Path::new("../outside")).await.is_err());
    }
}
