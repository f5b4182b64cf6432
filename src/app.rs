//! Composition root.
//!
//! [`App::activate`] wires configuration, storage, the HTTP fetcher, the
//! link hash cache and the processor together once; every subcommand then
//! runs against the resulting [`App`]. [`App::deactivate`] is the matching
//! shutdown hook.

use crate::cli::{Cli, Overrides};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::Serialized;
use futures::StreamExt;
use mdlocal_config::{Config, Settings};
use mdlocal_fetch::HttpFetcher;
use mdlocal_library::{Document, LinkHashCache, Materializer, Outcome, ProcessEvent, Processor, Vault, process_all};
use mdlocal_storage::BackendHandle;
use mdlocal_storage::backend::{LocalBackend, ReadOnlyBackend};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct App {
    config: Config,
    local: LocalBackend,
    cache: Arc<LinkHashCache>,
    processor: Processor,
}

impl App {
    pub fn activate(cli: &Cli) -> Result<Self> {
        let root = std::fs::canonicalize(&cli.vault).or_raise(|| ErrorKind::Vault(cli.vault.clone()))?;
        let figment = with_overrides(Settings::figment(&root, cli.config.as_deref()), &cli.overrides);
        let config = Config::from_figment(&figment).or_raise(|| ErrorKind::Config)?;

        let local = LocalBackend::new("vault", &root).or_raise(|| ErrorKind::Vault(root.clone()))?;
        let backend: BackendHandle = if cli.dry_run {
            info!("Dry run: nothing will be written");
            Arc::new(ReadOnlyBackend::new(Arc::new(local.clone())))
        } else {
            Arc::new(local.clone())
        };
        let fetcher = HttpFetcher::new(config.fetch_timeout).or_raise(|| ErrorKind::Fetcher)?;
        let cache = Arc::new(LinkHashCache::new());
        let materializer = Materializer::new(Arc::new(fetcher), backend.clone(), cache.clone());
        let vault = Vault::new(backend, config.media_root.clone());
        let processor = Processor::new(vault, materializer, config.clean_content);

        debug!(vault = %root.display(), media_root = %config.media_root.display(), "Activated");
        Ok(Self { config, local, cache, processor })
    }

    pub fn deactivate(self) {
        debug!(links = self.cache.len(), "Deactivated");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.local.root()
    }

    /// Resolve a command-line path, relative to the vault or absolute
    /// inside it, into a document.
    pub fn document(&self, path: &Path) -> Result<Document> {
        let relative = if path.is_absolute() {
            let absolute = std::fs::canonicalize(path).or_raise(|| ErrorKind::Document(path.to_path_buf()))?;
            self.local.relative_path(absolute).or_raise(|| ErrorKind::Document(path.to_path_buf()))?
        } else {
            path.to_path_buf()
        };
        Document::new(relative).or_raise(|| ErrorKind::Document(path.to_path_buf()))
    }

    /// The document a filesystem event path refers to, if it is one the
    /// pipeline should process.
    pub fn watched_document(&self, absolute: &Path) -> Option<Document> {
        let relative = self.local.relative_path(absolute).ok()?;
        if !self.processor.vault().is_document(&relative, &self.config.include) {
            return None;
        }
        Document::new(relative).ok()
    }

    /// Process one document, logging the outcome. Returns `false` on failure.
    pub async fn process(&self, document: Document) -> bool {
        match self.processor.process(&document).await {
            Ok(outcome) => {
                self.report(&document, outcome);
                true
            },
            Err(err) => {
                warn!(%document, error = ?err, "Processing failed");
                false
            },
        }
    }

    /// Returns the number of documents that failed.
    pub async fn process_files(&self, files: &[impl AsRef<Path>]) -> usize {
        let mut failed = 0;
        for file in files {
            let ok = match self.document(file.as_ref()) {
                Ok(document) => self.process(document).await,
                Err(err) => {
                    warn!(error = ?err, "Skipping");
                    false
                },
            };
            failed += usize::from(!ok);
        }
        failed
    }

    /// Returns the number of documents that failed.
    pub async fn process_all(&self) -> Result<usize> {
        let mut failed = 0;
        let mut events = std::pin::pin!(process_all(&self.processor, &self.config.include));
        while let Some(event) = events.next().await {
            match event {
                Ok(ProcessEvent::Started) => debug!("Discovering documents"),
                Ok(ProcessEvent::DiscoveryComplete(total)) => info!(total, "Processing documents"),
                Ok(ProcessEvent::Processed(document, outcome)) => self.report(&document, outcome),
                Ok(ProcessEvent::Complete) => info!(failed, "Finished"),
                Err(err) if matches!(&*err, mdlocal_library::error::ErrorKind::Document(_)) => {
                    warn!(error = ?err, "Processing failed");
                    failed += 1;
                },
                Err(err) => return Err(err).or_raise(|| ErrorKind::Discovery),
            }
        }
        Ok(failed)
    }

    /// Returns the number of documents that failed.
    pub async fn clean(&self, files: &[impl AsRef<Path>]) -> usize {
        let mut failed = 0;
        for file in files {
            let document = match self.document(file.as_ref()) {
                Ok(document) => document,
                Err(err) => {
                    warn!(error = ?err, "Skipping");
                    failed += 1;
                    continue;
                },
            };
            match self.processor.clean(&document).await {
                Ok(outcome) => self.report(&document, outcome),
                Err(err) => {
                    warn!(%document, error = ?err, "Cleanup failed");
                    failed += 1;
                },
            }
        }
        failed
    }

    fn report(&self, document: &Document, outcome: Outcome) {
        match outcome {
            Outcome::Unchanged => debug!(%document, "Nothing to do"),
            Outcome::Updated { replaced, cleaned } if self.config.show_notifications => {
                info!(%document, replaced, cleaned, "Updated document");
            },
            Outcome::Updated { replaced, cleaned } => debug!(%document, replaced, cleaned, "Updated document"),
        }
    }
}

fn with_overrides(mut figment: Figment, overrides: &Overrides) -> Figment {
    if let Some(include) = &overrides.include {
        figment = figment.merge(Serialized::default("include", include));
    }
    if let Some(media_root) = &overrides.media_root {
        figment = figment.merge(Serialized::default("media_root_directory", media_root));
    }
    if overrides.no_clean {
        figment = figment.merge(Serialized::default("clean_content", false));
    }
    if let Some(interval) = overrides.interval {
        figment = figment.merge(Serialized::default("real_time_update_interval", interval));
    }
    figment
}
