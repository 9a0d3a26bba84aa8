// image crate: RGB bitmap -> JPEG bytes

use crate::error::SnapMergeError;
use image::RgbImage;
use std::io::Cursor;

/// Encode an RGB image to JPEG bytes at the given quality (1-100).
pub fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(SnapMergeError::jpeg_encode(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }

    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(SnapMergeError::jpeg_encode(format!(
            "cannot encode a {}x{} image",
            rgb.width(),
            rgb.height()
        )));
    }

    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}
