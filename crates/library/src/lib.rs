//! The media localization pipeline.
//!
//! A [`Processor`] reads a [`Document`] from the [`Vault`], optionally repairs
//! dirty image tags ([`links::clean`]), finds every remote image link
//! ([`links::scan`]) and hands each one to the [`Materializer`], which
//! downloads the bytes, picks a collision-free local name through the
//! [`Resolver`] and writes the file. The document is saved only if its text
//! changed, so running the pipeline twice is the same as running it once.
//!
//! [`ChangeQueue`] and [`queue::run`] batch change notifications for
//! real-time processing; [`process_all`] walks the whole vault.

mod bulk;
mod cache;
pub mod error;
pub mod links;
mod materialize;
mod process;
pub mod queue;
mod resolve;
mod vault;

pub use crate::bulk::{ProcessEvent, process_all};
pub use crate::cache::{LinkHashCache, content_hash};
pub use crate::links::LinkMatch;
pub use crate::materialize::{Materialized, Materializer};
pub use crate::process::{Outcome, Processor, Rewrite};
pub use crate::queue::ChangeQueue;
pub use crate::resolve::{FILENAME_TEMPLATE, MAX_FILENAME_INDEX, Resolution, Resolver, sanitize};
pub use crate::vault::{Document, Vault};

/// Maximum number of documents [`process_all`] works on at once.
pub const MAX_PROCESS_CONCURRENCY: usize = 16;
