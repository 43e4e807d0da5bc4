//! Generation Error Types

use derive_more::{Display, Error};

/// A generation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source bytes are not an image in any supported format.
    #[display("could not decode source image: {_0}")]
    Decode(#[error(not(source))] String),
    /// A variant could not be encoded.
    #[display("could not encode {format} variant: {reason}")]
    Encode {
        /// Output format that failed (`png`, `ico`).
        format: &'static str,
        /// Encoder message.
        reason: String,
    },
    /// A stored label could not be parsed back into a model value.
    #[display("failed to parse {field}: {value:?}")]
    Parse {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending value.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Generation is pure: the same input fails the same way every time.
        false
    }
}
