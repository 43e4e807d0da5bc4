//! Record Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A record store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for record store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("favicon not found: {_0}")]
    FaviconNotFound(#[error(not(source))] String),
    /// The record already reached SUCCESS or FAILED.
    #[display("favicon {id} is already in terminal status {status}")]
    TerminalStatus {
        id: String,
        status: String,
    },
    /// A stored or supplied value does not fit the schema.
    #[display("invalid record data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // SQLITE_BUSY surfaces as a generic database error.
        matches!(self, Self::Database)
    }

    /// Returns `true` if the error means the record is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FaviconNotFound(_))
    }
}
