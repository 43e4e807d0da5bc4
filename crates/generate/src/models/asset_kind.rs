use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// File type of a generated asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Png,
    Ico,
    /// Reserved; never produced by generation.
    Svg,
}
impl AssetKind {
    /// Label persisted alongside the asset record.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Png => "PNG",
            AssetKind::Ico => "ICO",
            AssetKind::Svg => "SVG",
        }
    }

    /// File extension, including the leading dot.
    pub fn format(&self) -> &'static str {
        match self {
            AssetKind::Png => ".png",
            AssetKind::Ico => ".ico",
            AssetKind::Svg => ".svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AssetKind::Png => "image/png",
            AssetKind::Ico => "image/x-icon",
            AssetKind::Svg => "image/svg+xml",
        }
    }
}
impl TryFrom<String> for AssetKind {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}
impl FromStr for AssetKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "PNG" => Self::Png,
            "ICO" => Self::Ico,
            "SVG" => Self::Svg,
            _ => exn::bail!(ErrorKind::Parse {
                field: "asset type",
                value: s.to_string(),
            }),
        })
    }
}
impl Display for AssetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PNG", AssetKind::Png)]
    #[case("png", AssetKind::Png)]
    #[case(" ICO ", AssetKind::Ico)]
    #[case("SVG", AssetKind::Svg)]
    fn test_parse(#[case] input: &str, #[case] expected: AssetKind) {
        assert_eq!(input.parse::<AssetKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "GIF".parse::<AssetKind>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse { field: "asset type", .. }));
    }

    #[test]
    fn test_display_round_trips_through_storage_label() {
        for kind in [AssetKind::Png, AssetKind::Ico, AssetKind::Svg] {
            assert_eq!(kind.to_string().parse::<AssetKind>().unwrap(), kind);
        }
    }
}
