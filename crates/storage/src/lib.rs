//! Binary storage for a vault of markdown notes and their media.
//!
//! Everything that touches bytes on disk goes through [`StorageBackend`]:
//! documents are read and written as UTF-8 by higher layers, media files are
//! written verbatim. Paths are always relative to the vault root and are
//! checked with [`validate_path`] before use.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::{to_slash, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
