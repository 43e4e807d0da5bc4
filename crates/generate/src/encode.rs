//! Encoders for the two output formats.
//!
//! PNGs go through the `png` crate directly because `image`'s encoder has no
//! way to attach text chunks.

use crate::consts::METADATA_KEYWORD;
use crate::error::{ErrorKind, Result};
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::{ExtendedColorType, RgbaImage};

fn png_error(err: impl std::fmt::Display) -> ErrorKind {
    ErrorKind::Encode {
        format: "png",
        reason: err.to_string(),
    }
}

fn ico_error(err: impl std::fmt::Display) -> ErrorKind {
    ErrorKind::Encode {
        format: "ico",
        reason: err.to_string(),
    }
}

/// Encode an RGBA image as an 8-bit PNG, optionally carrying `metadata` in
/// an uncompressed iTXt `Description` chunk.
pub(crate) fn png(image: &RgbaImage, metadata: Option<&str>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(text) = metadata {
            encoder.add_itxt_chunk(METADATA_KEYWORD.to_string(), text.to_string()).map_err(png_error)?;
        }
        let mut writer = encoder.write_header().map_err(png_error)?;
        writer.write_image_data(image.as_raw()).map_err(png_error)?;
        writer.finish().map_err(png_error)?;
    }
    Ok(buffer)
}

/// Pack several square renderings into one ICO container, each frame stored
/// as an embedded PNG.
pub(crate) fn ico(frames: &[RgbaImage]) -> Result<Vec<u8>> {
    let frames = frames
        .iter()
        .map(|frame| {
            IcoFrame::as_png(frame.as_raw(), frame.width(), frame.height(), ExtendedColorType::Rgba8).map_err(ico_error)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut buffer = Vec::new();
    IcoEncoder::new(&mut buffer).encode_images(&frames).map_err(ico_error)?;
    Ok(buffer)
}
