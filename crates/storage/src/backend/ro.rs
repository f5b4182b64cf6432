//! Read-only (dry-run) storage backend.
//!
//! Wraps another backend and drops every mutating operation while still
//! reporting success, so a full processing pass can be previewed without
//! touching the vault.

use async_trait::async_trait;
use std::path::Path;

use crate::{BackendHandle, StorageBackend, backend::FileInfoStream, error::Result};

/// Read-only storage backend.
///
/// Reads pass straight through to the wrapped backend; writes and directory
/// creation are logged as an [`info event`](tracing::Event) and skipped.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(path = %path.display(), bytes = data.len(), "Skipping write during dry run");
        Ok(())
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping directory creation during dry run");
        Ok(())
    }
}
