//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Cloudflare R2, Backblaze B2, MinIO and others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file or the
//! environment (`AICON_STORAGE__KEY_ID`, `AICON_STORAGE__KEY_SECRET`).

use crate::backend::ObjectInfoStream;
use crate::error::{ErrorKind, Result};
use crate::key::{validate as validate_key, validate_prefix};
use crate::{ObjectInfo, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::{ByteStream, DateTime},
};
use exn::ResultExt;
use std::sync::Arc;
use time::{OffsetDateTime, UtcDateTime};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible storage backend.
///
/// Stores objects in an S3 bucket, optionally under a key prefix. All keys
/// are relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use aicon_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "r2",
///     "favicons",
///     Some("prod".to_string()),
///     "auto",
///     Some("https://<account>.r2.cloudflarestorage.com".to_string()),
///     "access_key_id",
///     "secret_access_key",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (`auto` for R2)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.filter(|p| !p.trim_matches('/').is_empty()).map(validate_key).transpose()?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "aicon-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for S3-compatible services (MinIO, R2, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Construct the full S3 key from a relative key.
    fn full_key(&self, key: &str) -> Result<String> {
        let validated = validate_key(key)?;
        Ok(join_prefix(self.prefix.as_deref(), &validated))
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("S3 rate limiter closed".to_string()))
    }

    async fn get_range(&self, key: &str, range: Option<String>) -> Result<Vec<u8>> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .set_range(range)
            .send()
            .await
            .map_err(|err| {
                let not_found = err.as_service_error().is_some_and(|e| e.is_no_such_key());
                match not_found {
                    true => ErrorKind::NotFound(key.to_string()),
                    false => map_sdk_error(err, key),
                }
            })?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|err| ErrorKind::Network(format!("reading body of {key}: {err}")))?;
        Ok(body.into_bytes().to_vec())
    }
}

/// Join the configured bucket prefix onto a validated key.
fn join_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

/// Strip the configured bucket prefix from a full S3 key.
fn strip_prefix<'k>(prefix: Option<&str>, full_key: &'k str) -> &'k str {
    match prefix {
        Some(prefix) => full_key
            .strip_prefix(prefix.trim_end_matches('/'))
            .and_then(|s| s.strip_prefix('/'))
            .unwrap_or(full_key),
        None => full_key,
    }
}

/// Prefix to send to `ListObjectsV2` for a validated listing prefix.
fn list_prefix(prefix: Option<&str>, listing: &str) -> String {
    match (prefix, listing.is_empty()) {
        (Some(prefix), true) => format!("{}/", prefix.trim_end_matches('/')),
        (Some(prefix), false) => join_prefix(Some(prefix), listing),
        (None, _) => listing.to_string(),
    }
}

/// Convert an AWS timestamp, falling back to the epoch for missing values.
fn parse_datetime(dt: Option<&DateTime>) -> Result<UtcDateTime> {
    let Some(dt) = dt else {
        return Ok(UtcDateTime::UNIX_EPOCH);
    };
    let offset = OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
        .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))?;
    Ok(offset.to_utc())
}

fn map_sdk_error<E, R>(err: SdkError<E, R>, key: &str) -> ErrorKind
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
        return ErrorKind::Network(format!("{key}: {}", DisplayErrorContext(&err)));
    }
    match err.as_service_error().and_then(|e| e.code()) {
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
            ErrorKind::PermissionDenied(key.to_string())
        },
        _ => ErrorKind::BackendError(format!("{key}: {}", DisplayErrorContext(&err))),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(level = "trace", skip(self, data), fields(backend = %self.name, size = data.len()))]
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|err| map_sdk_error(err, key))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.get_range(key, None).await
    }

    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>> {
        if bytes == 0 {
            // Still report missing objects consistently.
            self.stat(key).await?;
            return Ok(Vec::new());
        }
        // Ranges past the end of the object are truncated by S3.
        self.get_range(key, Some(format!("bytes=0-{}", bytes - 1))).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        // S3 deletes of missing keys already succeed.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| map_sdk_error(err, key))?;
        Ok(())
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| {
                let not_found = err.as_service_error().is_some_and(|e| e.is_not_found());
                match not_found {
                    true => ErrorKind::NotFound(key.to_string()),
                    false => map_sdk_error(err, key),
                }
            })?;
        let size = output.content_length().unwrap_or_default().max(0) as u64;
        let modified = parse_datetime(output.last_modified())?;
        let relative = validate_key(strip_prefix(self.prefix.as_deref(), &full_key))?;
        let info = ObjectInfo::new(relative, size, modified);
        Ok(match output.content_type() {
            Some(content_type) => info.with_content_type(content_type),
            None => info,
        })
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a> {
        let listing = match validate_prefix(prefix) {
            Ok(listing) => listing,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        let full_prefix = list_prefix(self.prefix.as_deref(), &listing);

        Box::pin(stream! {
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&full_prefix)
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = match page {
                    Ok(page) => page,
                    Err(err) => {
                        yield Err(exn::Exn::from(map_sdk_error(err, &full_prefix)));
                        return;
                    },
                };
                for object in page.contents() {
                    let Some(full_key) = object.key() else { continue };
                    let relative = match validate_key(strip_prefix(self.prefix.as_deref(), full_key)) {
                        Ok(relative) => relative,
                        Err(e) => { yield Err(e); continue; },
                    };
                    let modified = match parse_datetime(object.last_modified()) {
                        Ok(modified) => modified,
                        Err(e) => { yield Err(e); continue; },
                    };
                    let size = object.size().unwrap_or_default().max(0) as u64;
                    yield Ok(ObjectInfo::new(relative, size, modified));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "favicons/abc/16x16-x.png", "favicons/abc/16x16-x.png")]
    #[case(Some("prod"), "favicons/abc/16x16-x.png", "prod/favicons/abc/16x16-x.png")]
    #[case(Some("prod/"), "sources/abc/original", "prod/sources/abc/original")]
    fn test_join_prefix(#[case] prefix: Option<&str>, #[case] key: &str, #[case] expected: &str) {
        assert_eq!(join_prefix(prefix, key), expected);
    }

    #[rstest]
    #[case(None, "favicons/abc/1.png", "favicons/abc/1.png")]
    #[case(Some("prod"), "prod/favicons/abc/1.png", "favicons/abc/1.png")]
    #[case(Some("prod/"), "prod/favicons/abc/1.png", "favicons/abc/1.png")]
    #[case(Some("prod"), "production/x.png", "production/x.png")]
    fn test_strip_prefix(#[case] prefix: Option<&str>, #[case] full_key: &str, #[case] expected: &str) {
        assert_eq!(strip_prefix(prefix, full_key), expected);
    }

    #[rstest]
    #[case(None, "", "")]
    #[case(None, "favicons/abc/", "favicons/abc/")]
    #[case(Some("prod"), "", "prod/")]
    #[case(Some("prod"), "favicons/abc/", "prod/favicons/abc/")]
    fn test_list_prefix(#[case] prefix: Option<&str>, #[case] listing: &str, #[case] expected: &str) {
        assert_eq!(list_prefix(prefix, listing), expected);
    }

    #[test]
    fn test_parse_datetime() {
        assert_eq!(parse_datetime(None).unwrap(), UtcDateTime::UNIX_EPOCH);
        let dt = DateTime::from_secs(1_700_000_000);
        assert_eq!(parse_datetime(Some(&dt)).unwrap().unix_timestamp(), 1_700_000_000);
    }
}
