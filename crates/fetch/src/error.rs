//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a remote resource could not be downloaded.
///
/// Every variant leaves the link it came from untouched; nothing in this
/// crate retries.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The link is not an absolute `http`/`https` URL.
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// Connection failure, TLS failure or timeout.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The server answered with a non-success status.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The body exceeded the configured size ceiling.
    #[display("response larger than {_0} bytes")]
    TooLarge(#[error(not(source))] u64),
    /// The HTTP client could not be constructed.
    #[display("could not build HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status(code) => *code == 408 || *code == 429 || *code >= 500,
            Self::InvalidUrl(_) | Self::TooLarge(_) | Self::Client => false,
        }
    }
}
