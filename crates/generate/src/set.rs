use crate::consts::{APPLE_SIZES, ICO_FRAME_SIZES, STANDARD_SIZES, VARIANT_COUNT};
use crate::encode;
use crate::error::{ErrorKind, Result};
use crate::models::Variant;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tracing::instrument;

/// Options applied to every variant of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Text embedded into every PNG variant. Blank text counts as absent.
    pub embedded_metadata: Option<String>,
}
impl Options {
    pub fn with_metadata(metadata: impl Into<String>) -> Self {
        Self {
            embedded_metadata: Some(metadata.into()),
        }
    }

    fn metadata(&self) -> Option<&str> {
        self.embedded_metadata.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// Something that turns a source image into favicon variants.
///
/// Implementations must be pure: identical input yields identical output,
/// with no I/O. The pipeline only ever talks to this trait, so the ICO
/// packing or size table can change without touching orchestration.
pub trait Generate: Send + Sync {
    fn generate(&self, source: &[u8], options: &Options) -> Result<Vec<Variant>>;
}

/// The standard favicon set.
///
/// Nine standard PNG sizes ascending, then four Apple touch sizes ascending,
/// then one multi-resolution ICO. Every raster is cover-cropped to a square
/// around the centre of the source, so nothing is ever letterboxed or
/// stretched.
#[derive(Debug, Clone, Copy)]
pub struct FaviconSet {
    filter: FilterType,
}
impl FaviconSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resampling filter used for every rendering.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    fn render(&self, source: &DynamicImage, size: u32) -> RgbaImage {
        source.resize_to_fill(size, size, self.filter).to_rgba8()
    }
}
impl Default for FaviconSet {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Generate for FaviconSet {
    #[instrument(level = "debug", skip_all, fields(source_size = source.len()))]
    fn generate(&self, source: &[u8], options: &Options) -> Result<Vec<Variant>> {
        let decoded = image::load_from_memory(source).map_err(|err| ErrorKind::Decode(err.to_string()))?;
        tracing::debug!(width = decoded.width(), height = decoded.height(), "decoded source image");
        let metadata = options.metadata();

        let mut variants = Vec::with_capacity(VARIANT_COUNT);
        for size in STANDARD_SIZES.into_iter().chain(APPLE_SIZES) {
            let rendered = self.render(&decoded, size);
            variants.push(Variant::png(size, encode::png(&rendered, metadata)?));
        }
        let frames: Vec<RgbaImage> = ICO_FRAME_SIZES.into_iter().map(|size| self.render(&decoded, size)).collect();
        variants.push(Variant::ico(encode::ico(&frames)?));
        Ok(variants)
    }
}
