//! Key validation and normalisation.
//!
//! Keys are `/`-separated strings. They are joined onto a filesystem root by
//! [`LocalBackend`](crate::backend::LocalBackend) and onto a bucket prefix by
//! the S3 backend, so a key must never be able to climb out of either.

use crate::error::{ErrorKind, Result};

/// Validates a storage key and returns its normalised form.
///
/// Empty segments and `.` segments are dropped, `..` pops the previous
/// segment. A key that would climb above the root, that normalises to
/// nothing, or that contains null bytes or backslashes is rejected with
/// [`InvalidKey`](crate::error::ErrorKind::InvalidKey).
///
/// # Examples
///
/// ```
/// use aicon_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("sources/abc/original").is_ok());
/// assert!(validate_key("favicons/slug/../slug/16x16-a-icon.com.png").is_ok());
/// // Invalid keys
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a/../../b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// // Keys get normalised
/// assert_eq!(
///     validate_key("/favicons//slug/./32x32-example.com.png/").unwrap(),
///     "favicons/slug/32x32-example.com.png"
/// );
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let raw = key.as_ref();
    // Backslashes are separators on Windows; refuse them rather than guess.
    if raw.contains('\0') || raw.contains('\\') {
        exn::bail!(ErrorKind::InvalidKey(raw.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(raw.to_string()));
                }
            },
            s => segments.push(s),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(raw.to_string())),
        false => Ok(segments.join("/")),
    }
}

/// Validates a listing prefix.
///
/// Unlike keys, a prefix may be empty (list everything). A trailing `/` is
/// preserved so that `favicons/abc/` does not also match `favicons/abcdef/…`.
pub(crate) fn validate_prefix(prefix: impl AsRef<str>) -> Result<String> {
    let raw = prefix.as_ref();
    if raw.trim_matches('/').is_empty() {
        return Ok(String::new());
    }
    let normalised = validate(raw)?;
    Ok(match raw.ends_with('/') {
        true => format!("{normalised}/"),
        false => normalised,
    })
}
