//! Local image helpers: the deterministic placeholder and payload sniffing.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::GenerationError;

/// Width of the general provider's output and of the placeholder.
pub const GENERATION_WIDTH: u32 = 1024;
/// Height of the general provider's output and of the placeholder.
pub const GENERATION_HEIGHT: u32 = 768;
/// Solid fill of the placeholder image.
pub const PLACEHOLDER_COLOR: [u8; 4] = [73, 109, 137, 255];

/// Encode the placeholder used when the general provider has no
/// credentials: a solid 1024x768 RGBA PNG. Identical on every call.
pub fn placeholder_png() -> Result<Vec<u8>, GenerationError> {
    let img = RgbaImage::from_pixel(GENERATION_WIDTH, GENERATION_HEIGHT, Rgba(PLACEHOLDER_COLOR));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| GenerationError::Permanent(format!("Failed to encode placeholder: {e}")))?;
    Ok(out.into_inner())
}

/// Detect the image format of a payload from its magic bytes.
///
/// Returns `None` for empty or unrecognised payloads.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.is_empty() {
        return None;
    }
    image::guess_format(bytes).ok()
}

/// MIME type for a payload, defaulting to PNG.
pub fn mime_type(bytes: &[u8]) -> &'static str {
    sniff_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png")
}
