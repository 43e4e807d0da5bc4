mod asset_kind;
mod dimension;
mod variant;

pub use self::asset_kind::AssetKind;
pub use self::dimension::Dimension;
pub use self::variant::Variant;
