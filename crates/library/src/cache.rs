use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Non-cryptographic content hash used to recognise files already written.
pub fn content_hash(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Remembers the content hash of the first bytes seen for each remote URL.
///
/// Once a URL has a hash it is never updated, and nothing is ever evicted;
/// the cache lives exactly as long as the process. An existing file is
/// treated as "already downloaded" when its hash equals the *cached* hash
/// for the URL, not the hash of whatever the URL served most recently. If
/// the remote content changes during a run, the earlier download keeps
/// being reused.
#[derive(Debug, Default)]
pub struct LinkHashCache {
    hashes: Mutex<HashMap<String, u32>>,
}

impl LinkHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<u32> {
        self.lock().get(url).copied()
    }

    /// Returns the recorded hash for `url`, recording the hash of `bytes`
    /// first if the URL has not been seen yet.
    pub fn ensure(&self, url: &str, bytes: &[u8]) -> u32 {
        *self.lock().entry(url.to_string()).or_insert_with(|| {
            let hash = content_hash(bytes);
            tracing::trace!(url, hash, "Recorded link hash");
            hash
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.hashes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
