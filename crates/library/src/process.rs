//! Whole-document processing.

use crate::error::Result;
use crate::links::{self, LinkMatch};
use crate::materialize::Materializer;
use crate::vault::{Document, Vault};
use futures::future::join_all;
use std::borrow::Cow;
use tracing::instrument;

/// What [`Processor::process`] did to a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do; the document was not written.
    Unchanged,
    /// The document was rewritten.
    Updated {
        /// Remote links replaced by local paths.
        replaced: usize,
        /// Whether dirty tags were repaired.
        cleaned: bool,
    },
}

/// Result of rewriting a document body without saving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub replaced: usize,
    pub cleaned: bool,
}

#[derive(Clone)]
pub struct Processor {
    vault: Vault,
    materializer: Materializer,
    clean_content: bool,
}

impl Processor {
    pub fn new(vault: Vault, materializer: Materializer, clean_content: bool) -> Self {
        Self { vault, materializer, clean_content }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Localize every remote image in `document` and save it if anything
    /// changed.
    ///
    /// # Errors
    /// [`ErrorKind::Storage`](crate::error::ErrorKind::Storage) if the media
    /// root cannot be created or the document cannot be read or written;
    /// [`ErrorKind::Encoding`](crate::error::ErrorKind::Encoding) if it is not
    /// UTF-8. Failing links never fail the document.
    #[instrument(skip(self), fields(document = %document))]
    pub async fn process(&self, document: &Document) -> Result<Outcome> {
        self.vault.ensure_directory(self.vault.media_root()).await?;
        let original = self.vault.read_text(document).await?;
        let rewrite = self.process_text(&original).await;
        if rewrite.text == original {
            return Ok(Outcome::Unchanged);
        }
        self.vault.write_text(document, &rewrite.text).await?;
        Ok(Outcome::Updated { replaced: rewrite.replaced, cleaned: rewrite.cleaned })
    }

    /// Only repair dirty tags in `document`, without touching the network.
    #[instrument(skip(self), fields(document = %document))]
    pub async fn clean(&self, document: &Document) -> Result<Outcome> {
        let original = self.vault.read_text(document).await?;
        match links::clean(&original) {
            Cow::Borrowed(_) => Ok(Outcome::Unchanged),
            Cow::Owned(text) => {
                self.vault.write_text(document, &text).await?;
                Ok(Outcome::Updated { replaced: 0, cleaned: true })
            },
        }
    }

    /// Rewrite `text` in memory, downloading media into the vault's media
    /// root as a side effect.
    ///
    /// All remote links are materialized concurrently; replacements are
    /// spliced back by position, not completion order.
    pub async fn process_text(&self, text: &str) -> Rewrite {
        let cleaned = if self.clean_content { links::clean(text) } else { Cow::Borrowed(text) };
        let text = cleaned.as_ref();
        let matches: Vec<LinkMatch> = links::scan(text).filter(|link| links::is_remote(&link.target)).collect();
        let directory = self.vault.media_root();
        let replacements = join_all(matches.iter().map(|link| self.materializer.materialize(link, directory))).await;

        let mut out = String::with_capacity(text.len());
        let mut replaced = 0;
        let mut last = 0;
        for (link, replacement) in matches.iter().zip(&replacements) {
            out.push_str(&text[last..link.range.start]);
            out.push_str(replacement);
            last = link.range.end;
            if *replacement != link.text {
                replaced += 1;
            }
        }
        out.push_str(&text[last..]);
        tracing::trace!(links = matches.len(), replaced, "Rewrote document body");
        Rewrite { text: out, replaced, cleaned: matches!(cleaned, Cow::Owned(_)) }
    }
}
