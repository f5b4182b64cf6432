use crate::cache::LinkHashCache;
use crate::error::{ErrorKind, Result};
use crate::links::LinkMatch;
use crate::resolve::Resolver;
use exn::ResultExt;
use mdlocal_fetch::FetcherHandle;
use mdlocal_storage::{BackendHandle, to_slash};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Where a link's media ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Materialized {
    pub path: PathBuf,
    /// `false` when an identical earlier download was reused.
    pub written: bool,
}

/// Turns one remote image link into a local file.
///
/// Downloads run concurrently, but picking a name and writing the file
/// happen under one lock shared by every clone, so a name chosen as free
/// is taken before the next link looks at it.
#[derive(Clone)]
pub struct Materializer {
    fetcher: FetcherHandle,
    backend: BackendHandle,
    resolver: Resolver,
    store: Arc<Mutex<()>>,
}

impl Materializer {
    pub fn new(fetcher: FetcherHandle, backend: BackendHandle, cache: Arc<LinkHashCache>) -> Self {
        let resolver = Resolver::new(backend.clone(), cache);
        Self { fetcher, backend, resolver, store: Arc::new(Mutex::new(())) }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The markdown that should replace `link`.
    ///
    /// Never fails: any error is logged and the original link text is
    /// returned, so one bad link cannot spoil the rest of the document.
    pub async fn materialize(&self, link: &LinkMatch, directory: &Path) -> String {
        match self.try_materialize(link, directory).await {
            Ok(materialized) => format!("![{}]({})", link.anchor, to_slash(&materialized.path)),
            Err(err) => {
                tracing::warn!(url = %link.target, error = ?err, "Image processing failed, keeping remote link");
                link.text.clone()
            },
        }
    }

    /// Fetch, resolve and (if needed) write the media behind `link`.
    ///
    /// # Errors
    /// - [`ErrorKind::Fetch`] if the download fails; nothing is written.
    /// - [`ErrorKind::Storage`] or [`ErrorKind::FilenameExhausted`] from
    ///   resolving or writing the file.
    #[instrument(skip(self, link), fields(url = %link.target, offset = link.range.start))]
    pub async fn try_materialize(&self, link: &LinkMatch, directory: &Path) -> Result<Materialized> {
        let bytes = self.fetcher.fetch(&link.target).await.or_raise(|| ErrorKind::Fetch)?;
        let _store = self.store.lock().await;
        let resolution = self.resolver.resolve(directory, &link.anchor, &link.target, &bytes).await?;
        if resolution.need_write {
            self.backend.write(&resolution.path, &bytes).await.or_raise(|| ErrorKind::Storage)?;
            tracing::debug!(path = %resolution.path.display(), media_type = %resolution.media_type, "Stored media");
        }
        Ok(Materialized { path: resolution.path, written: resolution.need_write })
    }
}
