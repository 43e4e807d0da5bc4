use super::{AssetKind, Dimension};

/// One generated favicon asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub kind: AssetKind,
    pub dimension: Dimension,
    /// Encoded file contents.
    pub bytes: Vec<u8>,
}
impl Variant {
    pub fn png(size: u32, bytes: Vec<u8>) -> Self {
        Self {
            kind: AssetKind::Png,
            dimension: Dimension::Square(size),
            bytes,
        }
    }

    pub fn ico(bytes: Vec<u8>) -> Self {
        Self {
            kind: AssetKind::Ico,
            dimension: Dimension::Multi,
            bytes,
        }
    }

    /// File extension, including the leading dot.
    pub fn format(&self) -> &'static str {
        self.kind.format()
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }
}
