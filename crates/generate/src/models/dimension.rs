use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// Size label of a generated asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// A square raster of the given edge length, written `32x32`.
    Square(u32),
    /// A container holding several resolutions, written `MULTI`.
    Multi,
}
impl Dimension {
    const MULTI_LABEL: &'static str = "MULTI";

    /// Edge length in pixels, for square dimensions.
    pub fn size(&self) -> Option<u32> {
        match self {
            Dimension::Square(size) => Some(*size),
            Dimension::Multi => None,
        }
    }
}
impl TryFrom<String> for Dimension {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}
impl FromStr for Dimension {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::MULTI_LABEL {
            return Ok(Self::Multi);
        }
        let parse_error = || ErrorKind::Parse {
            field: "dimension",
            value: s.to_string(),
        };
        let Some((width, height)) = s.split_once('x') else {
            exn::bail!(parse_error());
        };
        match (width.parse::<u32>(), height.parse::<u32>()) {
            (Ok(width), Ok(height)) if width == height && width > 0 => Ok(Self::Square(width)),
            _ => exn::bail!(parse_error()),
        }
    }
}
impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Dimension::Square(size) => write!(f, "{size}x{size}"),
            Dimension::Multi => f.write_str(Self::MULTI_LABEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Dimension::Square(16), "16x16")]
    #[case(Dimension::Square(512), "512x512")]
    #[case(Dimension::Multi, "MULTI")]
    fn test_display(#[case] dimension: Dimension, #[case] expected: &str) {
        assert_eq!(dimension.to_string(), expected);
        assert_eq!(expected.parse::<Dimension>().unwrap(), dimension);
    }

    #[rstest]
    #[case("32x16")]
    #[case("0x0")]
    #[case("32")]
    #[case("multi")]
    #[case("axb")]
    fn test_parse_invalid(#[case] input: &str) {
        let err = input.parse::<Dimension>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse { field: "dimension", .. }));
    }
}
