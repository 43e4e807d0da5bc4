//! Favicon variant generation.
//!
//! A pure transformation from source image bytes to the ordered set of
//! favicon assets published for it. No I/O happens here; callers decide where
//! the bytes go.

mod consts;
mod encode;
pub mod error;
pub mod models;
mod set;

pub use crate::consts::{APPLE_SIZES, ICO_FRAME_SIZES, MAX_METADATA_CHARS, STANDARD_SIZES, VARIANT_COUNT};
use crate::error::Result;
use crate::models::Variant;
pub use crate::set::{FaviconSet, Generate, Options};

/// Easy, top-level entrypoint: generate the standard favicon set.
///
/// See [`FaviconSet`] for ordering and cropping behaviour.
pub fn generate(source: impl AsRef<[u8]>, options: &Options) -> Result<Vec<Variant>> {
    FaviconSet::default().generate(source.as_ref(), options)
}
