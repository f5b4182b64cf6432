//! Remote media retrieval.
//!
//! [`Fetcher`] is the network collaborator of the media pipeline: give it a
//! URL, get the raw bytes back or an [`ErrorKind`](error::ErrorKind)
//! explaining why not. There is deliberately no retry logic at this layer.

pub mod error;
mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use crate::http::HttpFetcher;
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockFetcher;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;

pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;

/// Downloads the bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the complete body of `url`.
    ///
    /// Fails with [`Network`](ErrorKind::Network) on connection failure or
    /// timeout and [`Status`](ErrorKind::Status) on a non-success response.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Parses `link` as an absolute `http`/`https` URL.
///
/// ```
/// use mdlocal_fetch::parse_remote;
/// assert!(parse_remote("https://example.com/cat.png").is_ok());
/// assert!(parse_remote("media/cat.png").is_err());
/// assert!(parse_remote("file:///etc/passwd").is_err());
/// ```
pub fn parse_remote(link: &str) -> Result<Url> {
    let url = Url::parse(link.trim()).map_err(|_| ErrorKind::InvalidUrl(link.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => exn::bail!(ErrorKind::InvalidUrl(link.to_string())),
    }
}

/// Returns `true` if `link` is something the pipeline should download.
pub fn is_remote(link: &str) -> bool {
    parse_remote(link).is_ok()
}
