//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the storage and fetch
//! crates are raised into one of these kinds, so the original cause stays
//! reachable through the error tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a pipeline failure.
///
/// ### Operational Errors
/// - [`ErrorKind::FilenameExhausted`]
/// - [`ErrorKind::Encoding`]
/// - [`ErrorKind::Document`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Fetch`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A storage backend operation (exists, read, write, create) failed.
    #[display("storage operation failed")]
    Storage,
    /// Downloading a remote link failed.
    #[display("could not fetch remote media")]
    Fetch,
    /// Every numbered candidate for this base name is taken by different content.
    #[display("no free file name left for `{_0}`")]
    FilenameExhausted(#[error(not(source))] String),
    /// A document is not valid UTF-8.
    #[display("document is not valid UTF-8: {}", _0.display())]
    Encoding(#[error(not(source))] PathBuf),
    /// Processing a single document failed during a bulk run.
    #[display("failed to process {_0}")]
    Document(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Fetch | Self::Document(_))
    }
}
