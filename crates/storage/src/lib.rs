//! Key-addressed blob storage.
//!
//! Everything the pipeline persists as bytes (original uploads and generated
//! favicon variants) lives behind the [`StorageBackend`] trait. Keys are
//! hierarchical, path-like strings (`sources/{id}/original`,
//! `favicons/{slug}/{filename}`), but the hierarchy is purely a caller
//! convention: backends never interpret it beyond prefix listing.

pub mod backend;
pub mod error;
mod key;
mod mime;
mod models;

pub use crate::backend::StorageBackend;
pub use crate::key::validate as validate_key;
pub use crate::mime::{DEFAULT_SOURCE_CONTENT_TYPE, SNIFF_LENGTH, content_type_for_key, sniff_content_type};
pub use crate::models::ObjectInfo;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
