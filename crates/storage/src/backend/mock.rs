//! In-memory storage backend for testing.

use super::ObjectInfoStream;
use crate::error::{ErrorKind, Result};
use crate::key::{validate as validate_key, validate_prefix};
use crate::{ObjectInfo, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use time::UtcDateTime;
use tokio::sync::RwLock;

struct StoredObject {
    inserted: UtcDateTime,
    data: Vec<u8>,
    content_type: String,
}

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Puts and
/// deletes can be made to fail for chosen keys to exercise partial-failure
/// and best-effort cleanup paths.
///
/// # Examples
///
/// ```
/// use aicon_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_objects([
///     ("sources/abc/original", b"\x89PNG...".to_vec()),
/// ]);
/// assert!(backend.exists("sources/abc/original").await?);
///
/// backend.put("favicons/xyz/16x16-a-icon.com.png", b"data...", "image/png").await?;
/// assert!(backend.exists("favicons/xyz/16x16-a-icon.com.png").await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<String, StoredObject>>,
    failing_puts: RwLock<HashSet<String>>,
    failing_deletes: RwLock<HashSet<String>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation (e.g. root traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = UtcDateTime::now();
        for (key, data) in objects {
            let key = key.as_ref();
            let Ok(validated) = validate_key(key) else {
                // MockBackend is intended to be used in tests; panics are
                // expected. There is no error result.
                panic!("MockBackend::with_objects: invalid key {key:?}");
            };
            let content_type = crate::content_type_for_key(&validated).to_string();
            map.insert(validated, StoredObject { inserted: now, data: data.into(), content_type });
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            failing_puts: RwLock::new(HashSet::new()),
            failing_deletes: RwLock::new(HashSet::new()),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every subsequent [`put()`](StorageBackend::put) of `key` fail
    /// with a [`BackendError`](ErrorKind::BackendError). Nothing is stored.
    ///
    /// Panics if the key fails validation.
    pub async fn fail_puts_for(&self, key: impl AsRef<str>) {
        let key = key.as_ref();
        let Ok(validated) = validate_key(key) else {
            panic!("MockBackend::fail_puts_for: invalid key {key:?}");
        };
        self.failing_puts.write().await.insert(validated);
    }

    /// Make every subsequent [`delete()`](StorageBackend::delete) of `key`
    /// fail with a [`BackendError`](ErrorKind::BackendError). The object
    /// itself stays in place.
    ///
    /// Panics if the key fails validation.
    pub async fn fail_deletes_for(&self, key: impl AsRef<str>) {
        let key = key.as_ref();
        let Ok(validated) = validate_key(key) else {
            panic!("MockBackend::fail_deletes_for: invalid key {key:?}");
        };
        self.failing_deletes.write().await.insert(validated);
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Whether the backend currently holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    /// Every stored key, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn object_info(key: &str, object: &StoredObject) -> ObjectInfo {
        ObjectInfo::new(key, object.data.len() as u64, object.inserted).with_content_type(&object.content_type)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, Vec<u8>); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let key = validate_key(key)?;
        if self.failing_puts.read().await.contains(&key) {
            exn::bail!(ErrorKind::BackendError(format!("injected put failure for {key}")));
        }
        let object = StoredObject {
            inserted: UtcDateTime::now(),
            data: data.to_vec(),
            content_type: content_type.to_string(),
        };
        self.storage.write().await.insert(key, object);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let object = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(object.data.clone())
    }

    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let object = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        let end = bytes.min(object.data.len());
        Ok(object.data[..end].to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        if self.failing_deletes.read().await.contains(&key) {
            exn::bail!(ErrorKind::BackendError(format!("injected delete failure for {key}")));
        }
        self.storage.write().await.remove(&key);
        Ok(())
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let object = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(Self::object_info(&key, object))
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> ObjectInfoStream<'a> {
        let prefix = match validate_prefix(prefix) {
            Ok(prefix) => prefix,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<ObjectInfo> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(key, _)| key.starts_with(&prefix))
                    .map(|(key, object)| Self::object_info(key, object))
                    .collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = MockBackend::default();
        backend.put("a.png", b"hello", "image/png").await.unwrap();
        assert_eq!(backend.get("a.png").await.unwrap(), b"hello");
        assert_eq!(backend.stat("a.png").await.unwrap().content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_with_objects() {
        let backend = MockBackend::with_objects([("one.png", b"1".to_vec()), ("dir/two.ico", b"2".to_vec())]);
        assert_eq!(backend.len().await, 2);
        assert_eq!(backend.keys().await, vec!["dir/two.ico", "one.png"]);
        assert_eq!(backend.stat("dir/two.ico").await.unwrap().content_type.as_deref(), Some("image/x-icon"));
    }

    #[tokio::test]
    #[should_panic(expected = "invalid key")]
    async fn test_with_objects_rejects_invalid_keys() {
        let _ = MockBackend::with_objects([("../escape", b"x".to_vec())]);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let backend = MockBackend::default();
        let err = backend.get("nope").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_head() {
        let backend = MockBackend::with_objects([("f", b"0123456789".to_vec())]);
        assert_eq!(backend.read_head("f", 3).await.unwrap(), b"012");
        assert_eq!(backend.read_head("f", 50).await.unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MockBackend::with_objects([("f", b"x".to_vec())]);
        backend.delete("f").await.unwrap();
        backend.delete("f").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_injected_delete_failure() {
        let backend = MockBackend::with_objects([("a", b"x".to_vec()), ("b", b"y".to_vec())]);
        backend.fail_deletes_for("a").await;
        let err = backend.delete("a").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BackendError(_)));
        backend.delete("b").await.unwrap();
        assert_eq!(backend.keys().await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_injected_put_failure() {
        let backend = MockBackend::default();
        backend.fail_puts_for("a.png").await;
        let err = backend.put("a.png", b"x", "image/png").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BackendError(_)));
        assert!(!backend.exists("a.png").await.unwrap());
        backend.put("b.png", b"y", "image/png").await.unwrap();
        assert_eq!(backend.keys().await, vec!["b.png"]);
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let backend = MockBackend::with_objects([
            ("favicons/abc/1.png", b"1".to_vec()),
            ("favicons/abc/2.png", b"2".to_vec()),
            ("favicons/abcd/3.png", b"3".to_vec()),
            ("sources/abc/original", b"4".to_vec()),
        ]);
        assert_eq!(backend.list("favicons/abc/").await.unwrap().len(), 2);
        assert_eq!(backend.list("favicons/").await.unwrap().len(), 3);
        assert_eq!(backend.list("").await.unwrap().len(), 4);
        assert!(backend.list("../x").await.is_err());
    }
}
