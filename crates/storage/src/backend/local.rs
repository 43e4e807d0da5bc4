//! Local filesystem storage backend.
//!
//! Objects are stored as plain files under a configured directory and
//! accessed using `tokio::fs` for async I/O. Content types are not persisted.

use crate::backend::ObjectInfoStream;
use crate::error::{ErrorKind, Result};
use crate::key::{validate as validate_key, validate_prefix};
use crate::{ObjectInfo, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tokio::io::AsyncReadExt;

enum WalkEntry {
    Object(ObjectInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use aicon_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/var/lib/aicon/storage")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory all keys are relative to
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root directory if
    /// it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let display = root.display().to_string();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(display));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(display));
            }
        } else {
            // Use non-async here; it only happens once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &display))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Validate a key and join it onto the root directory.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        let validated = validate_key(key)?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path under the root back into a key.
    fn relative_key(&self, absolute: &Path) -> Result<String> {
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{}` is not within root `{}`", absolute.display(), self.root.display()))
        })?;
        let segments = relative
            .components()
            .map(|component| match component {
                Component::Normal(s) => s
                    .to_str()
                    .ok_or_raise(|| ErrorKind::BackendError(format!("non UTF-8 path `{}`", absolute.display()))),
                _ => exn::bail!(ErrorKind::BackendError(format!("unexpected path `{}`", absolute.display()))),
            })
            .collect::<Result<Vec<_>>>()?;
        validate_key(segments.join("/"))
    }

    fn object_info(key: String, metadata: &Metadata) -> Result<ObjectInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(ObjectInfo::new(key, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Directory to start walking from for a given (validated) prefix.
    ///
    /// `favicons/abc/` walks `favicons/abc`, `favicons/ab` walks `favicons`
    /// and filters on the string prefix.
    fn walk_start(&self, prefix: &str) -> PathBuf {
        if prefix.is_empty() {
            return self.root.clone();
        }
        let joined = self.root.join(prefix.trim_end_matches('/'));
        match prefix.ends_with('/') {
            true => joined,
            false => joined.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
        }
    }

    async fn process_entry(&self, entry: DirEntry, prefix: &str) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(ErrorKind::Io)?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if !metadata.is_file() {
            // Silently drop what is most likely a broken symlink.
            return Ok(WalkEntry::Skip);
        }
        let key = self.relative_key(&path)?;
        if !key.starts_with(prefix) {
            return Ok(WalkEntry::Skip);
        }
        Ok(WalkEntry::Object(Self::object_info(key, &metadata)?))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        // Create parent directories if needed, to keep behaviour
        // consistent with S3-compatible storage.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, key))?;
        }
        fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, key))?;
        tracing::trace!(backend = %self.name, key, content_type, size = data.len(), "stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        let mut buffer = Vec::with_capacity(bytes);
        file.take(bytes as u64).read_to_end(&mut buffer).await.map_err(ErrorKind::Io)?;
        Ok(buffer)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        match fs::remove_file(&abs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => exn::bail!(Self::map_io_error(e, key)),
        }
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let abs_path = self.absolute_path(key)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        Self::object_info(validate_key(key)?, &metadata)
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a> {
        let prefix = match validate_prefix(prefix) {
            Ok(prefix) => prefix,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        let mut stack = vec![self.walk_start(&prefix)];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // To stay consistent with S3-compatible backends, listing
                    // a "directory" that doesn't exist is empty, not an error.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue 'dirs,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::Io(err)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(ErrorKind::Io(e))); continue 'entries; },
                    };
                    match self.process_entry(entry, &prefix).await {
                        Ok(WalkEntry::Object(info)) => yield Ok(info),
                        Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }
}
