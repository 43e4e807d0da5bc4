use super::timestamp;
use crate::error::{Error, ErrorKind};
use aicon_generate::models::{AssetKind, Dimension};
use exn::ResultExt;
use time::UtcDateTime;

/// A generated asset belonging to a favicon.
///
/// Created only by successful generation steps and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub favicon_id: String,
    pub kind: AssetKind,
    /// `None` for formats without a raster size.
    pub dimension: Option<Dimension>,
    /// File extension, including the leading dot.
    pub format: String,
    pub storage_key: String,
    pub mime_type: String,
    pub created_at: UtcDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    pub id: String,
    pub favicon_id: String,
    pub kind: AssetKind,
    pub dimension: Option<Dimension>,
    pub format: String,
    pub storage_key: String,
    pub mime_type: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct AssetRow {
    id: String,
    favicon_id: String,
    asset_type: String,
    dimension: Option<String>,
    format: String,
    storage_key: String,
    mime_type: String,
    created_at: i64,
}
impl TryFrom<AssetRow> for Asset {
    type Error = Error;
    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            favicon_id: row.favicon_id,
            kind: row.asset_type.parse::<AssetKind>().or_raise(|| ErrorKind::InvalidData("asset type"))?,
            dimension: row
                .dimension
                .map(|d| d.parse::<Dimension>())
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("dimension"))?,
            format: row.format,
            storage_key: row.storage_key,
            mime_type: row.mime_type,
            created_at: timestamp(row.created_at, "created at")?,
        })
    }
}
