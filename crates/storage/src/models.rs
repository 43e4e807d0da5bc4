//! Storage models.

use time::UtcDateTime;

/// Object metadata returned by storage backends.
///
/// Used by listings (prefix sweeps during deletion) and by `stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Normalised key, relative to the backend root/prefix
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
    /// Content type, when the backend records one
    pub content_type: Option<String>,
}
impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: u64, modified: impl Into<UtcDateTime>) -> Self {
        Self {
            key: key.into(),
            size,
            modified: modified.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
