//! Pipeline Error Types
//!
//! Each variant names the subsystem that failed and carries its rendered
//! message; the lower crate's error stays attached as a child frame.

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a pipeline failure.
///
/// ### Caller Errors
/// - [`ErrorKind::InvalidRequest`]
/// - [`ErrorKind::NotFound`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Persistence`]
/// - [`ErrorKind::Generation`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input the core itself checks (metadata length, data URL shape).
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),
    /// No record or blob exists for the given identifier.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A blob put/get/delete failed.
    #[display("{_0}")]
    Storage(#[error(not(source))] String),
    /// A record store operation failed.
    #[display("{_0}")]
    Persistence(#[error(not(source))] String),
    /// The source image could not be turned into variants.
    #[display("{_0}")]
    Generation(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Persistence(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[track_caller]
    pub(crate) fn storage(err: aicon_storage::error::Error) -> Error {
        let reason = (*err).to_string();
        match err.is_not_found() {
            true => err.raise(Self::NotFound(reason)),
            false => err.raise(Self::Storage(reason)),
        }
    }

    #[track_caller]
    pub(crate) fn persistence(err: aicon_db::error::Error) -> Error {
        let reason = (*err).to_string();
        match err.is_not_found() {
            true => err.raise(Self::NotFound(reason)),
            false => err.raise(Self::Persistence(reason)),
        }
    }

    #[track_caller]
    pub(crate) fn generation(err: aicon_generate::error::Error) -> Error {
        let reason = (*err).to_string();
        err.raise(Self::Generation(reason))
    }
}
