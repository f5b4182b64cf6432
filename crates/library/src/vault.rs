//! Document access on top of a storage backend.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use mdlocal_config::IncludePattern;
use mdlocal_storage::{BackendHandle, to_slash, validate_path};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A markdown note, identified by its vault-relative path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Document(PathBuf);

impl Document {
    /// # Errors
    /// [`ErrorKind::Storage`] if the path escapes the vault or is empty.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(validate_path(path).or_raise(|| ErrorKind::Storage)?))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_slash(&self.0))
    }
}

/// The note vault: UTF-8 documents plus a media root, all stored through
/// one [`BackendHandle`].
#[derive(Clone)]
pub struct Vault {
    backend: BackendHandle,
    media_root: PathBuf,
}

impl Vault {
    pub fn new(backend: BackendHandle, media_root: impl Into<PathBuf>) -> Self {
        Self { backend, media_root: media_root.into() }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    pub async fn read_text(&self, document: &Document) -> Result<String> {
        let bytes = self.backend.read(document.path()).await.or_raise(|| ErrorKind::Storage)?;
        String::from_utf8(bytes).or_raise(|| ErrorKind::Encoding(document.path().to_path_buf()))
    }

    pub async fn write_text(&self, document: &Document, text: &str) -> Result<()> {
        self.backend.write(document.path(), text.as_bytes()).await.or_raise(|| ErrorKind::Storage)
    }

    /// Create `path` if it does not exist yet. An existing directory is
    /// success.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ensure_directory(&self, path: &Path) -> Result<()> {
        self.backend.create_dir(path).await.or_raise(|| ErrorKind::Storage)
    }

    /// Returns `true` if `path` is a document the pipeline should touch:
    /// matched by `include` and not inside the media root.
    pub fn is_document(&self, path: &Path, include: &IncludePattern) -> bool {
        !path.starts_with(&self.media_root) && include.is_match(&to_slash(path))
    }

    /// Streams every document matching `include`.
    ///
    /// Only a failure to list the backend ends up as an `Err` item; the
    /// stream carries on with the remaining entries.
    pub fn list_documents<'a>(&'a self, include: &'a IncludePattern) -> impl Stream<Item = Result<Document>> + 'a {
        stream! {
            for await info in self.backend.list_stream(None) {
                match info.or_raise(|| ErrorKind::Storage) {
                    Ok(info) if self.is_document(&info.path, include) => {
                        yield Ok(Document(info.path));
                    },
                    Ok(_) => {},
                    Err(e) => {
                        yield Err(e);
                    },
                }
            }
        }
    }
}
