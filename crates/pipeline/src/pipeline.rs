use crate::error::{ErrorKind, Result};
use crate::fingerprint::fingerprint;
use crate::keys;
use crate::request::CreateRequest;
use crate::spawn::Spawner;
use aicon_db::Repository;
use aicon_db::models::{Asset, DirectoryPage, DirectoryQuery, Favicon, NewFavicon, Status};
use aicon_generate::{FaviconSet, Generate};
use aicon_storage::{BackendHandle, content_type_for_key, sniff_content_type};
use exn::OptionExt;
use std::sync::Arc;
use tracing::instrument;

/// Fallback domain used in variant keys when a request names none.
pub const DEFAULT_DOMAIN: &str = "a-icon.com";
/// How many favicons a batch deletion works on at once.
pub const DEFAULT_DELETE_CONCURRENCY: usize = 8;

/// What `create` does when a byte-identical source was seen before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Look the fingerprint up, but always allocate a new record.
    #[default]
    AlwaysCreate,
    /// Return the most recent pending or successful record with the same
    /// fingerprint without generating again. Failed records are skipped, so a
    /// later failure does not hide an earlier success.
    ReuseExisting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub default_domain: String,
    pub dedup: DedupPolicy,
    pub delete_concurrency: usize,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            default_domain: DEFAULT_DOMAIN.to_string(),
            dedup: DedupPolicy::default(),
            delete_concurrency: DEFAULT_DELETE_CONCURRENCY,
        }
    }
}

/// Identifiers handed back by [`Pipeline::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: String,
    pub slug: String,
    pub published_url: String,
    /// `Pending` for new records; whatever the reused record is at otherwise.
    pub status: Status,
    /// The identifiers belong to an earlier record with the same source.
    pub reused: bool,
}
impl Created {
    fn from_record(favicon: &Favicon, reused: bool) -> Self {
        Self {
            id: favicon.id.clone(),
            slug: favicon.slug.clone(),
            published_url: favicon.published_url.clone(),
            status: favicon.status,
            reused,
        }
    }
}

/// A favicon record together with its generated assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaviconDetail {
    pub favicon: Favicon,
    pub assets: Vec<Asset>,
}

/// Stored bytes plus the content type they should be served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// The favicon creation pipeline.
///
/// Cheap to clone: every clone shares the same storage backend, record store,
/// generator and spawner. Background generation tasks hold a clone.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) backend: BackendHandle,
    pub(crate) repo: Repository,
    pub(crate) generator: Arc<dyn Generate>,
    pub(crate) spawner: Arc<dyn Spawner>,
    pub(crate) settings: Arc<Settings>,
}

impl Pipeline {
    /// Create a pipeline generating the standard favicon set with default
    /// settings.
    pub fn new(backend: BackendHandle, repo: Repository, spawner: Arc<dyn Spawner>) -> Self {
        Self {
            backend,
            repo,
            generator: Arc::new(FaviconSet::default()),
            spawner,
            settings: Arc::new(Settings::default()),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generate>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Store the source, insert a `PENDING` record and hand generation off to
    /// the background.
    ///
    /// Returns as soon as the record exists; generation has not started yet.
    /// If the source cannot be stored, or the record cannot be inserted, no
    /// record is left behind and the error is returned.
    #[instrument(skip_all, fields(source_type = %request.source_type, size = request.source.len()))]
    pub async fn create(&self, request: CreateRequest) -> Result<Created> {
        let request = request.normalise()?;
        let fingerprint = fingerprint(&request.source);

        match self.settings.dedup {
            DedupPolicy::AlwaysCreate => {
                let existing = self.repo.find_by_fingerprint(&fingerprint).await.map_err(ErrorKind::persistence)?;
                if let Some(existing) = existing {
                    tracing::debug!(favicon_id = %existing.id, status = %existing.status, "source seen before");
                }
            },
            DedupPolicy::ReuseExisting => {
                let reusable = self
                    .repo
                    .find_reusable_by_fingerprint(&fingerprint)
                    .await
                    .map_err(ErrorKind::persistence)?;
                if let Some(existing) = reusable {
                    tracing::info!(favicon_id = %existing.id, slug = %existing.slug, "reusing existing favicon");
                    return Ok(Created::from_record(&existing, true));
                }
            },
        }

        let id = nanoid::nanoid!();
        let slug = nanoid::nanoid!(10);
        let source_key = keys::source_key(&id);
        self.backend
            .put(&source_key, &request.source, &request.content_type)
            .await
            .map_err(ErrorKind::storage)?;

        let new = NewFavicon::new(&id, &slug, request.source_type, &request.content_type)
            .with_title(request.title)
            .with_target_domain(request.target_domain)
            .with_fingerprint(fingerprint)
            .with_embedded_metadata(request.embedded_metadata);
        let favicon = match self.repo.insert_favicon(&new).await {
            Ok(favicon) => favicon,
            Err(err) => {
                if let Err(cleanup) = self.backend.delete(&source_key).await {
                    tracing::warn!(key = %source_key, error = ?cleanup, "could not remove orphaned source");
                }
                return Err(ErrorKind::persistence(err));
            },
        };
        tracing::info!(favicon_id = %favicon.id, slug = %favicon.slug, "favicon created");

        self.spawn_generation(&favicon, request.source);
        Ok(Created::from_record(&favicon, false))
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    pub async fn favicon(&self, id: &str) -> Result<FaviconDetail> {
        let favicon = self.repo.get_favicon(id).await.map_err(ErrorKind::persistence)?;
        let favicon = favicon.ok_or_raise(|| ErrorKind::NotFound(format!("favicon {id}")))?;
        self.with_assets(favicon).await
    }

    pub async fn favicon_by_slug(&self, slug: &str) -> Result<FaviconDetail> {
        let favicon = self.repo.get_favicon_by_slug(slug).await.map_err(ErrorKind::persistence)?;
        let favicon = favicon.ok_or_raise(|| ErrorKind::NotFound(format!("favicon /f/{slug}")))?;
        self.with_assets(favicon).await
    }

    async fn with_assets(&self, favicon: Favicon) -> Result<FaviconDetail> {
        let assets = self.repo.list_assets(&favicon.id).await.map_err(ErrorKind::persistence)?;
        Ok(FaviconDetail { favicon, assets })
    }

    /// One page of the public directory.
    pub async fn list_published(&self, query: &DirectoryQuery) -> Result<DirectoryPage> {
        self.repo.list_published(query).await.map_err(ErrorKind::persistence)
    }

    /// The original source bytes of a favicon, with a sniffed content type.
    ///
    /// Only the blob is consulted: a missing blob is "not found" whether or
    /// not the record still exists.
    pub async fn source(&self, favicon_id: &str) -> Result<Blob> {
        let bytes = self.backend.get(&keys::source_key(favicon_id)).await.map_err(ErrorKind::storage)?;
        Ok(Blob {
            content_type: sniff_content_type(&bytes),
            bytes,
        })
    }

    /// A generated variant by storage key, with a content type inferred from
    /// the key's extension.
    pub async fn asset(&self, key: &str) -> Result<Blob> {
        let bytes = self.backend.get(key).await.map_err(ErrorKind::storage)?;
        Ok(Blob {
            content_type: content_type_for_key(key),
            bytes,
        })
    }
}
