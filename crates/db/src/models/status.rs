use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// Generation lifecycle of a favicon record.
///
/// `Pending` is the only initial state; `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Success,
    Failed,
}
impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Success => "SUCCESS",
            Status::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Pending)
    }
}
impl FromStr for Status {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PENDING" => Self::Pending,
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            _ => exn::bail!(ErrorKind::InvalidData("status")),
        })
    }
}
impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Where the source bytes of a favicon came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// An uploaded image file.
    Upload,
    /// A drawing submitted from the canvas editor.
    Canvas,
}
impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Upload => "UPLOAD",
            SourceType::Canvas => "CANVAS",
        }
    }
}
impl FromStr for SourceType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "UPLOAD" => Self::Upload,
            "CANVAS" => Self::Canvas,
            _ => exn::bail!(ErrorKind::InvalidData("source type")),
        })
    }
}
impl Display for SourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
