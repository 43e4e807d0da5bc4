//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for blob storage across different backends (local filesystem,
//! S3-compatible services, in-memory for tests).

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::ObjectInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

type ObjectInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<ObjectInfo>> + Send + 'a>>;

/// Unified interface for blob storage backends.
///
/// A put/get/delete contract keyed by string, nothing more: backends know
/// nothing about favicons, records or the naming scheme layered on top of
/// them. All operations are asynchronous and take `&self`, so a backend can
/// be shared between the request path and any number of background
/// generation tasks.
///
/// # Keys
/// All keys are relative to the backend root and must be validated using
/// [`validate_key`](crate::validate_key) before use. Implementations enforce
/// this validation.
///
/// # Examples
///
/// ```
/// use aicon_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_original(backend: &dyn StorageBackend, id: &str) -> Result<u64> {
///     let key = format!("sources/{id}/original");
///     if backend.exists(&key).await? {
///         let data = backend.get(&key).await?;
///         Ok(data.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Store an object, replacing any existing object under the same key.
    ///
    /// The content type is recorded where the backend supports it (S3) and
    /// ignored otherwise; the serving path never relies on it.
    ///
    /// # Notes
    /// - Implementations should create intermediate "directories" as needed.
    ///
    /// ```no_run
    /// # use aicon_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend, png: &[u8]) -> Result<()> {
    /// backend.put("favicons/abc/32x32-example.com.png", png, "image/png").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Read an object's full contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Read only the first N bytes (for magic byte detection).
    ///
    /// If the object is smaller than `bytes`, returns the entire object.
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete an object.
    ///
    /// Idempotent: deleting a key that does not exist is **not** an error.
    /// Cascade deletes rely on this so that a retried or partially completed
    /// deletion can simply run again.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get object metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn stat(&self, key: &str) -> Result<ObjectInfo>;

    /// Stream metadata for every object whose key starts with `prefix`.
    ///
    /// The prefix is a plain string prefix (as in S3), so `favicons/abc`
    /// also matches `favicons/abcdef/...`; include the trailing `/` to
    /// restrict the listing to one "directory". An empty prefix lists
    /// everything.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use aicon_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream("favicons/abc/");
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.key, info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a>;

    /// Collect [`list_stream()`](Self::list_stream) into a [`Vec`].
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        self.list_stream(prefix).try_collect().await
    }
}
