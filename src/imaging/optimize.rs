// Bounded resize + lossy round trip for size control

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use tracing::debug;

use super::DecodedImage;
use super::jpeg::encode_rgb_to_jpeg;
use crate::error::SnapMergeError;

/// Parameters for [`optimize`].
#[derive(Debug, Clone, Copy)]
pub struct OptimizeParams {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality for the round trip (1-100)
    pub quality: u8,
}

/// Target dimensions that fit `width`x`height` inside `max_width`x`max_height`.
///
/// Images already inside the box are returned unchanged. Otherwise both sides
/// are scaled by `min(max_w / w, max_h / h)` and floored, never below 1.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale_w = max_width as f64 / width as f64;
    let scale_h = max_height as f64 / height as f64;
    // The limiting side lands exactly on the bound; the other is floored.
    if scale_w <= scale_h {
        let new_h = ((height as f64 * scale_w).floor() as u32).clamp(1, max_height);
        (max_width, new_h)
    } else {
        let new_w = ((width as f64 * scale_h).floor() as u32).clamp(1, max_width);
        (new_w, max_height)
    }
}

/// Downsize with Lanczos3 when the image exceeds the bound; otherwise a clone.
pub fn resize_to_fit(image: &DecodedImage, max_width: u32, max_height: u32) -> DecodedImage {
    let (w, h) = image.dimensions();
    let (new_w, new_h) = fit_within(w, h, max_width, max_height);
    if (new_w, new_h) == (w, h) {
        return image.clone();
    }

    debug!(from = ?(w, h), to = ?(new_w, new_h), "resizing image");
    DecodedImage::new(image::imageops::resize(
        image.pixels(),
        new_w,
        new_h,
        FilterType::Lanczos3,
    ))
}

/// Encode to `format` and decode straight back.
///
/// For JPEG this is the size-control step: the bitmap that reaches the page
/// renderer has already lost the detail a `quality` encode would drop.
/// Lossless formats ignore `quality`.
pub fn reencode(
    image: &DecodedImage,
    format: ImageFormat,
    quality: u8,
) -> crate::error::Result<DecodedImage> {
    let bytes = match format {
        ImageFormat::Jpeg => encode_rgb_to_jpeg(image.pixels(), quality)?,
        other => {
            let mut buf = Cursor::new(Vec::new());
            image.pixels().write_to(&mut buf, other)?;
            buf.into_inner()
        }
    };

    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
        SnapMergeError::jpeg_encode(format!("re-decoding {format:?} round trip failed: {e}"))
    })?;
    let rgb: RgbImage = decoded.to_rgb8();
    Ok(DecodedImage::new(rgb))
}

/// Resize into the bound, then JPEG round trip at `params.quality`.
pub fn optimize(image: &DecodedImage, params: &OptimizeParams) -> crate::error::Result<DecodedImage> {
    let resized = resize_to_fit(image, params.max_width, params.max_height);
    reencode(&resized, ImageFormat::Jpeg, params.quality)
}
