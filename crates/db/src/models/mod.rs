mod asset;
mod directory;
mod favicon;
mod status;

pub(crate) use self::asset::AssetRow;
pub use self::asset::{Asset, NewAsset};
pub(crate) use self::directory::DirectoryRow;
pub use self::directory::{DirectoryItem, DirectoryPage, DirectoryQuery, SortBy, SortDirection};
pub(crate) use self::favicon::FaviconRow;
pub use self::favicon::{ContentFingerprint, Favicon, NewFavicon};
pub use self::status::{SourceType, Status};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;

fn timestamp(value: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(value).or_raise(|| ErrorKind::InvalidData(field))
}
