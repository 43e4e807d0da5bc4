//! Content type inference for stored objects.
//!
//! Backends don't persist content types reliably (the local filesystem has
//! nowhere to put them), so the serving path infers them: originals are
//! sniffed from their leading bytes, generated variants are looked up by the
//! extension baked into their key.

/// Content type assumed for an original upload whose bytes match nothing.
pub const DEFAULT_SOURCE_CONTENT_TYPE: &str = "image/png";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const GIF_MAGIC: [u8; 3] = [0x47, 0x49, 0x46];
const ICO_MAGIC: [u8; 4] = [0x00, 0x00, 0x01, 0x00];
/// How far into a document to look for an SVG/XML preamble.
const TEXT_SNIFF_LIMIT: usize = 100;

/// Number of leading bytes [`sniff_content_type`] needs to see.
pub const SNIFF_LENGTH: usize = TEXT_SNIFF_LIMIT;

/// Infer the content type of an original upload from its magic bytes.
///
/// Recognises PNG, JPEG, GIF, ICO and SVG (an `<svg` or `<?xml` preamble,
/// leading whitespace allowed). Anything else is reported as
/// [`DEFAULT_SOURCE_CONTENT_TYPE`].
#[must_use]
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&PNG_MAGIC) {
        return "image/png";
    }
    if bytes.starts_with(&JPEG_MAGIC) {
        return "image/jpeg";
    }
    if bytes.starts_with(&GIF_MAGIC) {
        return "image/gif";
    }
    if bytes.starts_with(&ICO_MAGIC) {
        return "image/x-icon";
    }
    let head = &bytes[..bytes.len().min(TEXT_SNIFF_LIMIT)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start();
    if text.starts_with("<svg") || text.starts_with("<?xml") {
        return "image/svg+xml";
    }
    DEFAULT_SOURCE_CONTENT_TYPE
}

/// Infer the content type of a generated asset from its key's extension.
#[must_use]
pub fn content_type_for_key(key: &str) -> &'static str {
    let filename = key.rsplit('/').next().unwrap_or(key);
    let Some((stem, extension)) = filename.rsplit_once('.') else {
        return FALLBACK_CONTENT_TYPE;
    };
    // A dotfile (".png") has no extension.
    if stem.is_empty() {
        return FALLBACK_CONTENT_TYPE;
    }
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "jpg" | "jpeg" => "image/jpeg",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], "image/png")]
    #[case(&[0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")]
    #[case(b"GIF89a", "image/gif")]
    #[case(&[0x00, 0x00, 0x01, 0x00, 0x01], "image/x-icon")]
    #[case(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>", "image/svg+xml")]
    #[case(b"  \n<svg/>", "image/svg+xml")]
    #[case(b"<?xml version=\"1.0\"?><svg/>", "image/svg+xml")]
    #[case(b"definitely not an image", "image/png")]
    #[case(b"", "image/png")]
    fn test_sniff_content_type(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(sniff_content_type(bytes), expected);
    }

    #[rstest]
    #[case("favicons/abc/32x32-example.com.png", "image/png")]
    #[case("favicons/abc/favicon-example.com.ico", "image/x-icon")]
    #[case("favicons/abc/logo.SVG", "image/svg+xml")]
    #[case("favicons/abc/photo.jpg", "image/jpeg")]
    #[case("favicons/abc/photo.jpeg", "image/jpeg")]
    #[case("sources/abc/original", "application/octet-stream")]
    #[case("favicons/abc/archive.tar", "application/octet-stream")]
    #[case("favicons/abc/.png", "application/octet-stream")]
    fn test_content_type_for_key(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(content_type_for_key(key), expected);
    }
}
