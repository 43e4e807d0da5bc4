/// Square PNG sizes generated for every favicon, ascending.
pub const STANDARD_SIZES: [u32; 9] = [16, 32, 48, 64, 96, 128, 192, 256, 512];
/// Apple touch icon sizes, ascending. Generated after the standard set.
pub const APPLE_SIZES: [u32; 4] = [120, 152, 167, 180];
/// Frames packed into the ICO container.
pub const ICO_FRAME_SIZES: [u32; 3] = [16, 32, 48];
/// Total number of variants produced for one source image.
pub const VARIANT_COUNT: usize = STANDARD_SIZES.len() + APPLE_SIZES.len() + 1;

/// PNG text keyword the embedded metadata is written under.
pub const METADATA_KEYWORD: &str = "Description";
/// Longest embedded metadata string accepted, in characters.
pub const MAX_METADATA_CHARS: usize = 256;
