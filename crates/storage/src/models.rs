//! Storage models.

use std::path::PathBuf;

/// A file found while listing a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from the vault root
    pub path: PathBuf,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}
