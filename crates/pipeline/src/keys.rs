//! Storage key naming.
//!
//! Keys are persisted in asset records and must stay stable for existing
//! data:
//! - `sources/{favicon_id}/original` for the uploaded or drawn source,
//! - `favicons/{slug}/{label}-{domain}{format}` for every variant, where the
//!   label is the dimension (`32x32`) or `favicon` for the multi-resolution
//!   ICO.

use aicon_generate::models::Dimension;

/// Label used in place of a dimension for multi-resolution containers.
const MULTI_LABEL: &str = "favicon";

pub fn source_key(favicon_id: &str) -> String {
    format!("sources/{favicon_id}/original")
}

/// Every variant of a favicon lives under this prefix.
pub fn favicon_prefix(slug: &str) -> String {
    format!("favicons/{slug}/")
}

pub fn variant_label(dimension: Dimension) -> String {
    match dimension {
        Dimension::Square(_) => dimension.to_string(),
        Dimension::Multi => MULTI_LABEL.to_string(),
    }
}

/// `format` includes the leading dot.
pub fn variant_key(slug: &str, dimension: Dimension, domain: &str, format: &str) -> String {
    format!("{}{}-{domain}{format}", favicon_prefix(slug), variant_label(dimension))
}
