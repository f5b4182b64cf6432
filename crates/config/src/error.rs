//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// All of these mean "fix the configuration"; none are retryable.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source could not be read or deserialized.
    #[display("could not load configuration")]
    Load,
    /// The include pattern is not a valid regular expression.
    #[display("invalid include pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// The include pattern risks catastrophic backtracking.
    #[display("unsafe include pattern: {_0}")]
    UnsafePattern(#[error(not(source))] String),
    /// The real-time update interval must be a positive number of milliseconds.
    #[display("real-time update interval must be greater than zero")]
    InvalidInterval,
    /// The media root directory must be a relative path inside the vault.
    #[display("invalid media root directory: {_0}")]
    InvalidMediaRoot(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
