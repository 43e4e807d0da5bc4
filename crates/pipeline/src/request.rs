//! Inbound creation requests.

use crate::error::{ErrorKind, Result};
use aicon_db::models::SourceType;
use aicon_generate::MAX_METADATA_CHARS;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use exn::ResultExt;

/// A request to create a favicon from source bytes.
///
/// Syntax checks on the domain, file size and MIME type belong to the
/// caller; the pipeline only normalises the optional labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub source: Vec<u8>,
    pub content_type: String,
    pub source_type: SourceType,
    pub title: Option<String>,
    pub target_domain: Option<String>,
    pub embedded_metadata: Option<String>,
}
impl CreateRequest {
    pub fn upload(source: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content_type: content_type.into(),
            source_type: SourceType::Upload,
            title: None,
            target_domain: None,
            embedded_metadata: None,
        }
    }

    /// A canvas drawing submitted as a `data:image/...;base64,...` URL.
    pub fn canvas(data_url: &str) -> Result<Self> {
        let DataUrl { bytes, content_type } = decode_data_url(data_url)?;
        Ok(Self {
            source_type: SourceType::Canvas,
            ..Self::upload(bytes, content_type)
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_target_domain(mut self, target_domain: impl Into<String>) -> Self {
        self.target_domain = Some(target_domain.into());
        self
    }

    pub fn with_embedded_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.embedded_metadata = Some(metadata.into());
        self
    }

    /// Trim the optional labels, dropping blank ones, and enforce the
    /// metadata length limit.
    pub(crate) fn normalise(mut self) -> Result<Self> {
        self.title = blank_to_none(self.title);
        self.target_domain = blank_to_none(self.target_domain);
        self.embedded_metadata = blank_to_none(self.embedded_metadata);
        if let Some(metadata) = &self.embedded_metadata {
            let chars = metadata.chars().count();
            if chars > MAX_METADATA_CHARS {
                exn::bail!(ErrorKind::InvalidRequest(format!(
                    "embedded metadata is {chars} characters, at most {MAX_METADATA_CHARS} allowed"
                )));
            }
        }
        Ok(self)
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Decoded contents of a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Decode a base64 image data URL, as produced by `canvas.toDataURL()`.
pub fn decode_data_url(url: &str) -> Result<DataUrl> {
    let invalid = |reason: &str| ErrorKind::InvalidRequest(format!("invalid data URL: {reason}"));
    let Some(rest) = url.trim().strip_prefix("data:") else {
        exn::bail!(invalid("missing `data:` scheme"));
    };
    let Some((header, payload)) = rest.split_once(',') else {
        exn::bail!(invalid("missing `,` separator"));
    };
    let Some(content_type) = header.strip_suffix(";base64") else {
        exn::bail!(invalid("only base64 payloads are supported"));
    };
    // Parameters such as `;charset=` may sit between the type and `;base64`.
    let content_type = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        exn::bail!(invalid("not an image"));
    }
    let bytes = STANDARD.decode(payload.trim()).or_raise(|| invalid("payload is not valid base64"))?;
    if bytes.is_empty() {
        exn::bail!(invalid("empty payload"));
    }
    Ok(DataUrl { bytes, content_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_decode_data_url() {
        let decoded = decode_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(decoded.content_type, "image/png");
        assert_eq!(decoded.bytes, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_decode_data_url_with_parameters() {
        let decoded = decode_data_url("data:Image/PNG;name=x.png;base64,aGk=").unwrap();
        assert_eq!(decoded.content_type, "image/png");
        assert_eq!(decoded.bytes, b"hi");
    }

    #[rstest]
    #[case("image/png;base64,aGk=")]
    #[case("data:image/png;base64")]
    #[case("data:image/png,aGk=")]
    #[case("data:text/plain;base64,aGk=")]
    #[case("data:image/png;base64,!!!")]
    #[case("data:image/png;base64,")]
    fn test_invalid_data_urls(#[case] url: &str) {
        let err = decode_data_url(url).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRequest(_)));
    }

    #[test]
    fn test_canvas_request() {
        let request = CreateRequest::canvas("data:image/png;base64,aGk=").unwrap();
        assert_eq!(request.source_type, SourceType::Canvas);
        assert_eq!(request.content_type, "image/png");
    }

    #[test]
    fn test_normalise_trims_and_drops_blanks() {
        let request = CreateRequest::upload(b"x".to_vec(), "image/png")
            .with_title("  My Site ")
            .with_target_domain("   ")
            .with_embedded_metadata("\n hidden \t")
            .normalise()
            .unwrap();
        assert_eq!(request.title.as_deref(), Some("My Site"));
        assert_eq!(request.target_domain, None);
        assert_eq!(request.embedded_metadata.as_deref(), Some("hidden"));
    }

    #[rstest]
    #[case(256, true)]
    #[case(257, false)]
    fn test_metadata_limit(#[case] chars: usize, #[case] accepted: bool) {
        // Multi-byte characters count once.
        let metadata = "é".repeat(chars);
        let result = CreateRequest::upload(b"x".to_vec(), "image/png").with_embedded_metadata(metadata).normalise();
        assert_eq!(result.is_ok(), accepted);
    }
}
