pub mod font;
pub mod jpeg;
pub mod label;
pub mod normalize;
pub mod optimize;

use image::RgbImage;

/// Opaque RGB bitmap flowing through the per-file stages.
///
/// Each stage takes one of these and returns a new one; nothing is edited in
/// place once a stage has handed it on.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}
