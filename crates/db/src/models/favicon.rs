use super::{SourceType, Status, timestamp};
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// Hash digest and byte length of a source image, used together as a
/// best-effort duplicate detection key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint {
    pub hash: String,
    pub size: u64,
}

/// A favicon record as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favicon {
    pub id: String,
    pub slug: String,
    pub title: Option<String>,
    pub target_domain: Option<String>,
    /// Public path (`/f/{slug}`), fixed at creation.
    pub published_url: String,
    pub source_type: SourceType,
    pub source_content_type: String,
    /// Absent only for records created before fingerprinting existed.
    pub fingerprint: Option<ContentFingerprint>,
    pub is_published: bool,
    pub status: Status,
    /// Set only when `status` is [`Status::Failed`].
    pub status_error: Option<String>,
    pub embedded_metadata: Option<String>,
    pub has_steganography: bool,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
    /// Set on the transition into a terminal status.
    pub generated_at: Option<UtcDateTime>,
}

/// Everything needed to insert a new `PENDING` favicon record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFavicon {
    pub id: String,
    pub slug: String,
    pub title: Option<String>,
    pub target_domain: Option<String>,
    pub source_type: SourceType,
    pub source_content_type: String,
    pub fingerprint: Option<ContentFingerprint>,
    pub embedded_metadata: Option<String>,
}
impl NewFavicon {
    pub fn new(
        id: impl Into<String>,
        slug: impl Into<String>,
        source_type: SourceType,
        source_content_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: None,
            target_domain: None,
            source_type,
            source_content_type: source_content_type.into(),
            fingerprint: None,
            embedded_metadata: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_target_domain(mut self, target_domain: Option<String>) -> Self {
        self.target_domain = target_domain;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: ContentFingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn with_embedded_metadata(mut self, embedded_metadata: Option<String>) -> Self {
        self.embedded_metadata = embedded_metadata;
        self
    }

    /// Public path the record will be published under.
    pub fn published_url(&self) -> String {
        format!("/f/{}", self.slug)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FaviconRow {
    id: String,
    slug: String,
    title: Option<String>,
    target_domain: Option<String>,
    published_url: String,
    source_type: String,
    source_content_type: String,
    content_hash: Option<String>,
    content_size: Option<i64>,
    is_published: bool,
    status: String,
    status_error: Option<String>,
    embedded_metadata: Option<String>,
    has_steganography: bool,
    created_at: i64,
    updated_at: i64,
    generated_at: Option<i64>,
}
impl TryFrom<FaviconRow> for Favicon {
    type Error = Error;
    fn try_from(row: FaviconRow) -> Result<Self, Self::Error> {
        let fingerprint = match (row.content_hash, row.content_size) {
            (Some(hash), Some(size)) => Some(ContentFingerprint {
                hash,
                size: u64::try_from(size).or_raise(|| ErrorKind::InvalidData("content size"))?,
            }),
            (None, None) => None,
            _ => exn::bail!(ErrorKind::InvalidData("content fingerprint")),
        };
        Ok(Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            target_domain: row.target_domain,
            published_url: row.published_url,
            source_type: row.source_type.parse()?,
            source_content_type: row.source_content_type,
            fingerprint,
            is_published: row.is_published,
            status: row.status.parse()?,
            status_error: row.status_error,
            embedded_metadata: row.embedded_metadata,
            has_steganography: row.has_steganography,
            created_at: timestamp(row.created_at, "created at")?,
            updated_at: timestamp(row.updated_at, "updated at")?,
            generated_at: row.generated_at.map(|t| timestamp(t, "generated at")).transpose()?,
        })
    }
}
