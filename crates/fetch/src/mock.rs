//! In-memory fetcher for testing.

use crate::error::{ErrorKind, Result};
use crate::{Fetcher, parse_remote};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves canned responses keyed by URL.
///
/// Unknown URLs answer with a 404 [`Status`](ErrorKind::Status); URLs
/// registered through [`failing`](Self::failing) answer with a
/// [`Network`](ErrorKind::Network) error. Every call is counted so tests can
/// assert on how often the network was hit.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, std::result::Result<Vec<u8>, ErrorKind>>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn with_responses(responses: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let responses = responses.into_iter().map(|(url, body)| (url.into(), Ok(body.into()))).collect();
        Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
    }

    /// Register (or replace) the body served for `url`.
    pub fn respond(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.lock().insert(url.into(), Ok(body.into()));
    }

    /// Make `url` fail as if the connection dropped.
    pub fn failing(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.lock().insert(url.clone(), Err(ErrorKind::Network(format!("connection reset fetching {url}"))));
        self
    }

    /// Total number of [`fetch`](Fetcher::fetch) calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, std::result::Result<Vec<u8>, ErrorKind>>> {
        self.responses.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        parse_remote(url)?;
        match self.lock().get(url).cloned() {
            Some(Ok(body)) => Ok(body),
            Some(Err(kind)) => exn::bail!(kind),
            None => exn::bail!(ErrorKind::Status(404)),
        }
    }
}
