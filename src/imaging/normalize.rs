// Decode uploaded bytes and flatten any color mode to opaque RGB

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use tracing::debug;

use super::DecodedImage;
use crate::error::SnapMergeError;

/// Decode `bytes` and convert the result to opaque RGB.
///
/// There is no size or content-type gate here: anything the decoder accepts
/// with non-zero dimensions is a valid image. Images with an alpha channel
/// (palette images with transparency decode to RGBA) are composited onto
/// white; every other mode is converted directly.
///
/// Returns [`SnapMergeError::DecodeError`] carrying the decoder's reason;
/// `filename` is only used for logging, the caller records it with the skip.
pub fn normalize(bytes: &[u8], filename: &str) -> crate::error::Result<DecodedImage> {
    let decoded = image::load_from_memory(bytes).map_err(|e| SnapMergeError::decode(e.to_string()))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(SnapMergeError::decode(format!(
            "degenerate dimensions {}x{}",
            decoded.width(),
            decoded.height()
        )));
    }

    debug!(
        filename,
        color = ?decoded.color(),
        width = decoded.width(),
        height = decoded.height(),
        "decoded upload"
    );

    Ok(DecodedImage::new(to_opaque_rgb(decoded)))
}

/// Convert any [`DynamicImage`] to RGB, flattening transparency onto white.
pub fn to_opaque_rgb(img: DynamicImage) -> RgbImage {
    if img.color().has_alpha() {
        flatten_onto_white(&img.to_rgba8())
    } else {
        match img {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        }
    }
}

/// Alpha-composite an RGBA bitmap over an opaque white background.
pub fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = p[3] as u32;
        Rgb([
            blend_on_white(p[0], alpha),
            blend_on_white(p[1], alpha),
            blend_on_white(p[2], alpha),
        ])
    })
}

fn blend_on_white(channel: u8, alpha: u32) -> u8 {
    ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}
