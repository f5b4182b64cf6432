//! Command-line error types.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A command-line error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command-line operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration could not be loaded or failed validation.
    #[display("invalid configuration")]
    Config,
    /// The vault directory is missing or unusable.
    #[display("cannot open vault {}", _0.display())]
    Vault(#[error(not(source))] PathBuf),
    /// A path given on the command line is not a document in the vault.
    #[display("not a document in this vault: {}", _0.display())]
    Document(#[error(not(source))] PathBuf),
    /// The HTTP client could not be built.
    #[display("could not set up downloads")]
    Fetcher,
    /// The filesystem watcher failed.
    #[display("file watcher failed")]
    Watch,
    /// `watch` was requested with `real_time_update` switched off.
    #[display("real-time updates are disabled; set `real_time_update = true`")]
    RealTimeDisabled,
    /// Discovering documents for a bulk run failed.
    #[display("could not list documents")]
    Discovery,
}
