use super::timestamp;
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// Column the public directory is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Creation time.
    Date,
    /// Published URL, equivalently the slug.
    Url,
    #[default]
    Domain,
}
impl SortBy {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            SortBy::Date => "created_at",
            SortBy::Url => "slug",
            SortBy::Domain => "target_domain",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}
impl SortDirection {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One page of the public directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub direction: SortDirection,
}
impl DirectoryQuery {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// Rows to skip. Page 0 is treated as page 1.
    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
    }
}
impl Default for DirectoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
            sort_by: SortBy::default(),
            direction: SortDirection::default(),
        }
    }
}

/// Directory entry for a published favicon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryItem {
    pub id: String,
    pub slug: String,
    pub title: Option<String>,
    pub target_domain: Option<String>,
    pub published_url: String,
    pub created_at: UtcDateTime,
    /// Generated assets recorded so far.
    pub asset_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPage {
    pub items: Vec<DirectoryItem>,
    /// Published favicons across all pages.
    pub total: u64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct DirectoryRow {
    id: String,
    slug: String,
    title: Option<String>,
    target_domain: Option<String>,
    published_url: String,
    created_at: i64,
    asset_count: i64,
}
impl TryFrom<DirectoryRow> for DirectoryItem {
    type Error = Error;
    fn try_from(row: DirectoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            target_domain: row.target_domain,
            published_url: row.published_url,
            created_at: timestamp(row.created_at, "created at")?,
            asset_count: u64::try_from(row.asset_count).or_raise(|| ErrorKind::InvalidData("asset count"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 100, 0)]
    #[case(1, 100, 0)]
    #[case(2, 100, 100)]
    #[case(3, 25, 50)]
    fn test_offset(#[case] page: u32, #[case] page_size: u32, #[case] expected: i64) {
        let query = DirectoryQuery {
            page,
            page_size,
            ..Default::default()
        };
        assert_eq!(query.offset(), expected);
    }
}
