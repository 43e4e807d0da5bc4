//! The favicon creation pipeline.
//!
//! Ties the blob store, the record store and the generator together:
//!
//! 1. [`Pipeline::create`] fingerprints the source, stores it, inserts a
//!    `PENDING` record and returns straight away.
//! 2. A detached generation task renders every variant, stores each one and
//!    moves the record to `SUCCESS` or `FAILED`.
//! 3. Callers poll the record through [`Pipeline::favicon`] or
//!    [`Pipeline::favicon_by_slug`], fetch bytes through [`Pipeline::source`]
//!    and [`Pipeline::asset`], and remove everything with
//!    [`Pipeline::delete_favicon`].
//!
//! Where detached tasks run is up to the [`Spawner`] handed to the pipeline.

mod delete;
pub mod error;
mod fingerprint;
mod generation;
pub mod keys;
mod pipeline;
mod request;
mod spawn;

pub use crate::delete::{DeleteSummary, DeletionResult};
pub use crate::fingerprint::fingerprint;
pub use crate::pipeline::{
    Blob, Created, DEFAULT_DELETE_CONCURRENCY, DEFAULT_DOMAIN, DedupPolicy, FaviconDetail, Pipeline, Settings,
};
pub use crate::request::{CreateRequest, DataUrl, decode_data_url};
pub use crate::spawn::{DeferredSpawner, Spawner, Task, TokioSpawner};
