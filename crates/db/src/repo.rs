//! Repository for favicon records and their generated assets.
//!
//! Assets never outlive their favicon: deleting a favicon removes its asset
//! rows in the same transaction (and the foreign key cascades regardless).

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{
    Asset, AssetRow, ContentFingerprint, DirectoryItem, DirectoryPage, DirectoryQuery, DirectoryRow, Favicon,
    FaviconRow, NewAsset, NewFavicon, Status,
};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use time::UtcDateTime;
use tracing::instrument;

/// Repository for managing favicon and asset records.
///
/// Cheap to clone; every clone shares the same connection pool.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn sqlx_hates_u64(value: u64, field: &'static str) -> Result<i64> {
        i64::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a new favicon record in the `PENDING` state.
    ///
    /// The record is published immediately and its published URL is fixed
    /// here, never to be recomputed.
    #[instrument(level = "debug", skip_all, fields(favicon_id = %favicon.id, slug = %favicon.slug))]
    pub async fn insert_favicon(&self, favicon: &NewFavicon) -> Result<Favicon> {
        let now = UtcDateTime::now().unix_timestamp();
        let (content_hash, content_size) = match &favicon.fingerprint {
            Some(ContentFingerprint { hash, size }) => {
                (Some(hash.as_str()), Some(Self::sqlx_hates_u64(*size, "content size")?))
            },
            None => (None, None),
        };
        sqlx::query(include_str!("../queries/insert_favicon.sql"))
            .bind(&favicon.id)
            .bind(&favicon.slug)
            .bind(favicon.title.as_deref())
            .bind(favicon.target_domain.as_deref())
            .bind(favicon.published_url())
            .bind(favicon.source_type.as_str())
            .bind(&favicon.source_content_type)
            .bind(content_hash)
            .bind(content_size)
            .bind(true)
            .bind(favicon.embedded_metadata.as_deref())
            .bind(false)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.get_favicon(&favicon.id)
            .await?
            .ok_or_raise(|| ErrorKind::FaviconNotFound(favicon.id.clone()))
    }

    /// Record a generated asset for an existing favicon.
    pub async fn insert_asset(&self, asset: &NewAsset) -> Result<Asset> {
        let created_at = UtcDateTime::now();
        sqlx::query(include_str!("../queries/insert_asset.sql"))
            .bind(&asset.id)
            .bind(&asset.favicon_id)
            .bind(asset.kind.as_str())
            .bind(asset.dimension.map(|d| d.to_string()))
            .bind(&asset.format)
            .bind(&asset.storage_key)
            .bind(&asset.mime_type)
            .bind(created_at.unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Asset {
            id: asset.id.clone(),
            favicon_id: asset.favicon_id.clone(),
            kind: asset.kind,
            dimension: asset.dimension,
            format: asset.format.clone(),
            storage_key: asset.storage_key.clone(),
            mime_type: asset.mime_type.clone(),
            // Stored with second precision; hand back what a read would see.
            created_at: created_at.replace_nanosecond(0).unwrap_or(created_at),
        })
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    pub async fn get_favicon(&self, id: impl AsRef<str>) -> Result<Option<Favicon>> {
        let row: Option<FaviconRow> = sqlx::query_as(include_str!("../queries/get_favicon_by_id.sql"))
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Favicon::try_from).transpose()
    }

    pub async fn get_favicon_by_slug(&self, slug: impl AsRef<str>) -> Result<Option<Favicon>> {
        let row: Option<FaviconRow> = sqlx::query_as(include_str!("../queries/get_favicon_by_slug.sql"))
            .bind(slug.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Favicon::try_from).transpose()
    }

    /// Find the most recently inserted favicon with the given fingerprint,
    /// whatever its status.
    ///
    /// Reads go through the same pool as writes, so a record is visible here
    /// as soon as [`insert_favicon()`](Self::insert_favicon) returns.
    pub async fn find_by_fingerprint(&self, fingerprint: &ContentFingerprint) -> Result<Option<Favicon>> {
        let row: Option<FaviconRow> = sqlx::query_as(include_str!("../queries/find_by_fingerprint.sql"))
            .bind(&fingerprint.hash)
            .bind(Self::sqlx_hates_u64(fingerprint.size, "content size")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Favicon::try_from).transpose()
    }

    /// Like [`find_by_fingerprint()`](Self::find_by_fingerprint), but skips
    /// `FAILED` records, so an older pending or successful one still matches.
    pub async fn find_reusable_by_fingerprint(&self, fingerprint: &ContentFingerprint) -> Result<Option<Favicon>> {
        let row: Option<FaviconRow> = sqlx::query_as(include_str!("../queries/find_reusable_by_fingerprint.sql"))
            .bind(&fingerprint.hash)
            .bind(Self::sqlx_hates_u64(fingerprint.size, "content size")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Favicon::try_from).transpose()
    }

    /// All assets of a favicon, in the order they were recorded.
    pub async fn list_assets(&self, favicon_id: impl AsRef<str>) -> Result<Vec<Asset>> {
        let rows: Vec<AssetRow> = sqlx::query_as(include_str!("../queries/list_assets.sql"))
            .bind(favicon_id.as_ref())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Asset::try_from).collect()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// One page of published favicons, plus the total published count.
    pub async fn list_published(&self, query: &DirectoryQuery) -> Result<DirectoryPage> {
        let total: i64 = sqlx::query_scalar(include_str!("../queries/count_published.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        // Column and direction come from closed enums, never from user input.
        let sql = format!(
            "{} ORDER BY {column} {direction}, id {direction} LIMIT ? OFFSET ?",
            include_str!("../queries/list_published.sql").trim_end(),
            column = query.sort_by.column(),
            direction = query.direction.keyword(),
        );
        let rows: Vec<DirectoryRow> = sqlx::query_as(&sql)
            .bind(i64::from(query.page_size))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(DirectoryPage {
            items: rows.into_iter().map(DirectoryItem::try_from).collect::<Result<Vec<_>>>()?,
            total: u64::try_from(total).or_raise(|| ErrorKind::InvalidData("published count"))?,
        })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Move a `PENDING` favicon into a terminal status.
    ///
    /// `error` is only stored for [`Status::Failed`]. `generated_at` is
    /// stamped on every terminal transition.
    ///
    /// Returns [`ErrorKind::FaviconNotFound`] for unknown ids and
    /// [`ErrorKind::TerminalStatus`] if the record already left `PENDING`.
    #[instrument(level = "debug", skip_all, fields(favicon_id = %id.as_ref(), %status))]
    pub async fn update_status(&self, id: impl AsRef<str>, status: Status, error: Option<&str>) -> Result<()> {
        let id = id.as_ref();
        if !status.is_terminal() {
            exn::bail!(ErrorKind::InvalidData("target status"));
        }
        let now = UtcDateTime::now().unix_timestamp();
        let error = match status {
            Status::Failed => Some(error.unwrap_or("unknown error")),
            _ => None,
        };
        let result = sqlx::query(include_str!("../queries/update_status.sql"))
            .bind(status.as_str())
            .bind(error)
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() > 0 {
            return Ok(());
        }
        let current: Option<String> = sqlx::query_scalar(include_str!("../queries/get_status.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match current {
            None => exn::bail!(ErrorKind::FaviconNotFound(id.to_string())),
            Some(status) => exn::bail!(ErrorKind::TerminalStatus {
                id: id.to_string(),
                status,
            }),
        }
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a favicon and all of its asset rows in one transaction.
    ///
    /// Returns [`ErrorKind::FaviconNotFound`] if no such favicon exists.
    #[instrument(level = "debug", skip_all, fields(favicon_id = %id.as_ref()))]
    pub async fn delete_favicon(&self, id: impl AsRef<str>) -> Result<()> {
        let id = id.as_ref();
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/delete_assets.sql"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let result = sqlx::query(include_str!("../queries/delete_favicon.sql"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            exn::bail!(ErrorKind::FaviconNotFound(id.to_string()));
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortBy, SortDirection, SourceType};
    use aicon_generate::models::{AssetKind, Dimension};

    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    fn fingerprint(hash: &str, size: u64) -> ContentFingerprint {
        ContentFingerprint {
            hash: hash.to_string(),
            size,
        }
    }

    fn new_favicon(id: &str, slug: &str) -> NewFavicon {
        NewFavicon::new(id, slug, SourceType::Upload, "image/png")
            .with_target_domain(Some(format!("{slug}.example")))
            .with_fingerprint(fingerprint("abc123", 42))
    }

    fn new_asset(id: &str, favicon_id: &str, size: u32) -> NewAsset {
        NewAsset {
            id: id.to_string(),
            favicon_id: favicon_id.to_string(),
            kind: AssetKind::Png,
            dimension: Some(Dimension::Square(size)),
            format: ".png".to_string(),
            storage_key: format!("favicons/{favicon_id}/{size}x{size}-a-icon.com.png"),
            mime_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let inserted = repo
            .insert_favicon(&new_favicon("f1", "slug000001").with_title(Some("Title".to_string())))
            .await
            .unwrap();
        assert_eq!(inserted.status, Status::Pending);
        assert!(inserted.is_published);
        assert!(!inserted.has_steganography);
        assert_eq!(inserted.published_url, "/f/slug000001");
        assert!(inserted.generated_at.is_none());
        assert!(inserted.status_error.is_none());

        assert_eq!(repo.get_favicon("f1").await.unwrap(), Some(inserted.clone()));
        assert_eq!(repo.get_favicon_by_slug("slug000001").await.unwrap(), Some(inserted));
        assert!(repo.get_favicon("missing").await.unwrap().is_none());
        assert!(repo.get_favicon_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slug_and_id_are_unique() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        let err = repo.insert_favicon(&new_favicon("f2", "slug000001")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
        let err = repo.insert_favicon(&new_favicon("f1", "slug000002")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
    }

    #[tokio::test]
    async fn test_find_by_fingerprint_returns_latest() {
        let repo = repo().await;
        assert!(repo.find_by_fingerprint(&fingerprint("abc123", 42)).await.unwrap().is_none());
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        repo.insert_favicon(&new_favicon("f2", "slug000002")).await.unwrap();
        // Same hash, different size is a different fingerprint.
        let mut other = new_favicon("f3", "slug000003");
        other.fingerprint = Some(fingerprint("abc123", 43));
        repo.insert_favicon(&other).await.unwrap();

        let found = repo.find_by_fingerprint(&fingerprint("abc123", 42)).await.unwrap().unwrap();
        assert_eq!(found.id, "f2");
        let found = repo.find_by_fingerprint(&fingerprint("abc123", 43)).await.unwrap().unwrap();
        assert_eq!(found.id, "f3");
    }

    #[tokio::test]
    async fn test_find_reusable_skips_failed() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        repo.update_status("f1", Status::Success, None).await.unwrap();
        repo.insert_favicon(&new_favicon("f2", "slug000002")).await.unwrap();
        repo.update_status("f2", Status::Failed, Some("boom")).await.unwrap();

        let latest = repo.find_by_fingerprint(&fingerprint("abc123", 42)).await.unwrap().unwrap();
        assert_eq!(latest.id, "f2");
        let reusable = repo.find_reusable_by_fingerprint(&fingerprint("abc123", 42)).await.unwrap().unwrap();
        assert_eq!(reusable.id, "f1");

        // A newer pending record takes over.
        repo.insert_favicon(&new_favicon("f3", "slug000003")).await.unwrap();
        let reusable = repo.find_reusable_by_fingerprint(&fingerprint("abc123", 42)).await.unwrap().unwrap();
        assert_eq!(reusable.id, "f3");
        assert!(repo.find_reusable_by_fingerprint(&fingerprint("abc123", 43)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status_success() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        repo.update_status("f1", Status::Success, Some("ignored")).await.unwrap();
        let favicon = repo.get_favicon("f1").await.unwrap().unwrap();
        assert_eq!(favicon.status, Status::Success);
        assert!(favicon.status_error.is_none());
        assert!(favicon.generated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_status_failed() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        repo.update_status("f1", Status::Failed, Some("could not decode")).await.unwrap();
        let favicon = repo.get_favicon("f1").await.unwrap().unwrap();
        assert_eq!(favicon.status, Status::Failed);
        assert_eq!(favicon.status_error.as_deref(), Some("could not decode"));
        assert!(favicon.generated_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_status_never_changes() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        repo.update_status("f1", Status::Success, None).await.unwrap();
        let err = repo.update_status("f1", Status::Failed, Some("late failure")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::TerminalStatus { status, .. } if status == "SUCCESS"));
        assert_eq!(repo.get_favicon("f1").await.unwrap().unwrap().status, Status::Success);
    }

    #[tokio::test]
    async fn test_update_status_rejects_pending_and_unknown() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        let err = repo.update_status("f1", Status::Pending, None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("target status")));
        let err = repo.update_status("missing", Status::Success, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_assets_in_insertion_order() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        for (i, size) in [16, 32, 48].into_iter().enumerate() {
            repo.insert_asset(&new_asset(&format!("a{i}"), "f1", size)).await.unwrap();
        }
        let mut ico = new_asset("a3", "f1", 0);
        ico.kind = AssetKind::Ico;
        ico.dimension = Some(Dimension::Multi);
        ico.format = ".ico".to_string();
        repo.insert_asset(&ico).await.unwrap();

        let assets = repo.list_assets("f1").await.unwrap();
        let dimensions: Vec<_> = assets.iter().map(|a| a.dimension.unwrap().to_string()).collect();
        assert_eq!(dimensions, vec!["16x16", "32x32", "48x48", "MULTI"]);
        assert!(repo.list_assets("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_asset_requires_favicon() {
        let repo = repo().await;
        let err = repo.insert_asset(&new_asset("a1", "missing", 16)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let repo = repo().await;
        repo.insert_favicon(&new_favicon("f1", "slug000001")).await.unwrap();
        repo.insert_favicon(&new_favicon("f2", "slug000002")).await.unwrap();
        repo.insert_asset(&new_asset("a1", "f1", 16)).await.unwrap();
        repo.insert_asset(&new_asset("a2", "f2", 16)).await.unwrap();

        repo.delete_favicon("f1").await.unwrap();
        assert!(repo.get_favicon("f1").await.unwrap().is_none());
        assert!(repo.get_favicon_by_slug("slug000001").await.unwrap().is_none());
        assert!(repo.list_assets("f1").await.unwrap().is_empty());
        // Other records are untouched.
        assert_eq!(repo.list_assets("f2").await.unwrap().len(), 1);

        let err = repo.delete_favicon("f1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_published() {
        let repo = repo().await;
        for (id, slug, domain) in [("f1", "cccccccccc", "b.com"), ("f2", "aaaaaaaaaa", "c.com"), ("f3", "bbbbbbbbbb", "a.com")] {
            let new = NewFavicon::new(id, slug, SourceType::Upload, "image/png").with_target_domain(Some(domain.into()));
            repo.insert_favicon(&new).await.unwrap();
        }

        for (i, size) in [16, 32].into_iter().enumerate() {
            repo.insert_asset(&new_asset(&format!("a{i}"), "f1", size)).await.unwrap();
        }

        let page = repo.list_published(&DirectoryQuery::default()).await.unwrap();
        assert_eq!(page.total, 3);
        let domains: Vec<_> = page.items.iter().map(|i| i.target_domain.clone().unwrap()).collect();
        assert_eq!(domains, vec!["a.com", "b.com", "c.com"]);
        let counts: Vec<_> = page.items.iter().map(|i| i.asset_count).collect();
        assert_eq!(counts, vec![0, 2, 0]);

        let query = DirectoryQuery {
            sort_by: SortBy::Url,
            direction: SortDirection::Descending,
            page_size: 2,
            ..Default::default()
        };
        let page = repo.list_published(&query).await.unwrap();
        assert_eq!(page.total, 3);
        let slugs: Vec<_> = page.items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["cccccccccc", "bbbbbbbbbb"]);

        let page = repo.list_published(&DirectoryQuery { page: 2, ..query }).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].published_url, "/f/aaaaaaaaaa");
    }
}
