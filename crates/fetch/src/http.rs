use crate::error::{ErrorKind, Result};
use crate::{Fetcher, parse_remote};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

/// Default request timeout, covering connect and body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default ceiling on a single download.
pub const DEFAULT_MAX_BYTES: u64 = 64 * 1024 * 1024;

/// [`Fetcher`] backed by a shared [`reqwest::Client`].
///
/// ```no_run
/// use mdlocal_fetch::{Fetcher, HttpFetcher};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new(Duration::from_secs(10))?;
/// let bytes = fetcher.fetch("https://example.com/cat.png").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client, max_bytes: DEFAULT_MAX_BYTES })
    }

    /// Override the download size ceiling.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn network(err: reqwest::Error) -> ErrorKind {
        ErrorKind::Network(err.without_url().to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(status, bytes))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = parse_remote(url)?;
        let mut response = self.client.get(url).send().await.map_err(Self::network)?;
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        if let Some(length) = response.content_length()
            && length > self.max_bytes
        {
            exn::bail!(ErrorKind::TooLarge(self.max_bytes));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(Self::network)? {
            // Content-Length can be absent or wrong; enforce the ceiling on what actually arrives.
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                exn::bail!(ErrorKind::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        tracing::Span::current().record("bytes", body.len());
        tracing::debug!("Downloaded remote media");
        Ok(body)
    }
}
