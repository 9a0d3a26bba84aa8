// Filename caption strip appended under each image

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

use super::DecodedImage;
use crate::pipeline::naming::clean_name;

/// Light gray drop shadow.
pub const SHADOW_COLOR: Rgb<u8> = Rgb([200, 200, 200]);
/// Dark slate text.
pub const TEXT_COLOR: Rgb<u8> = Rgb([44, 62, 80]);
pub const SHADOW_OFFSET: i32 = 2;
/// Horizontal breathing room on each side of the strip.
pub const STRIP_PADDING_PX: u32 = 10;
/// Font size is `image width / FONT_WIDTH_RATIO` before clamping.
const FONT_WIDTH_RATIO: f32 = 25.0;
const FONT_STEP: f32 = 1.0;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy)]
pub struct LabelStyle {
    /// Height of the strip appended below the image.
    pub margin_px: u32,
    pub font_min: f32,
    pub font_max: f32,
}

/// Where and how big the caption is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub text: String,
    pub font_size: f32,
    pub text_width: f32,
    /// Left edge of the main text.
    pub x: i32,
}

/// Width available to the caption, shadow included.
pub fn usable_width(image_width: u32) -> f32 {
    (image_width as f32 - 2.0 * STRIP_PADDING_PX as f32 - SHADOW_OFFSET as f32).max(0.0)
}

pub fn initial_font_size(image_width: u32, style: &LabelStyle) -> f32 {
    // max/min rather than clamp: an inverted range must not panic
    (image_width as f32 / FONT_WIDTH_RATIO)
        .min(style.font_max)
        .max(style.font_min)
}

/// Pick a font size (and if needed, a truncated text) that fits the strip.
///
/// `measure(text, size)` returns the advance width of `text` at `size`.
/// The size shrinks one step at a time down to `style.font_min`; if the text
/// still overflows it is cut and suffixed with `...`.
pub fn fit_label<M>(text: &str, image_width: u32, style: &LabelStyle, measure: M) -> LabelLayout
where
    M: Fn(&str, f32) -> f32,
{
    let available = usable_width(image_width);
    let mut size = initial_font_size(image_width, style);

    while measure(text, size) > available && size > style.font_min {
        size = (size - FONT_STEP).max(style.font_min);
    }

    let mut fitted = text.to_string();
    if measure(&fitted, size) > available {
        let mut chars: Vec<char> = text.chars().collect();
        fitted.clear();
        while !chars.is_empty() {
            chars.pop();
            let candidate: String = chars.iter().collect::<String>() + ELLIPSIS;
            if measure(&candidate, size) <= available {
                fitted = candidate;
                break;
            }
        }
    }

    let text_width = measure(&fitted, size);
    let x = ((image_width as f32 - text_width) / 2.0).round() as i32;
    LabelLayout {
        text: fitted,
        font_size: size,
        text_width,
        x,
    }
}

/// Advance width of `text` at `size`, kerning included.
pub fn measure_text<F: Font>(font: &F, text: &str, size: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut width = 0.0;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Caption text for an upload: extension stripped, or `Document N` when the
/// name is empty after cleaning.
pub fn label_text(filename: &str, page_ordinal: usize) -> String {
    let cleaned = clean_name(filename);
    if cleaned.is_empty() {
        format!("Document {page_ordinal}")
    } else {
        cleaned
    }
}

/// Return a new image `style.margin_px` taller than `image` with the cleaned
/// filename centered in the bottom strip.
///
/// Without a font the strip is still added, just left blank.
pub fn compose_label(
    image: &DecodedImage,
    filename: &str,
    page_ordinal: usize,
    style: &LabelStyle,
    font: Option<&FontVec>,
) -> DecodedImage {
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(width, height + style.margin_px, Rgb([255, 255, 255]));
    image::imageops::replace(&mut canvas, image.pixels(), 0, 0);

    let Some(font) = font else {
        return DecodedImage::new(canvas);
    };

    let text = label_text(filename, page_ordinal);
    let layout = fit_label(&text, width, style, |t, size| measure_text(font, t, size));
    if layout.text.is_empty() {
        return DecodedImage::new(canvas);
    }

    debug!(
        page = page_ordinal,
        font_size = layout.font_size,
        text = %layout.text,
        "drawing label"
    );

    let scale = PxScale::from(layout.font_size);
    let y = height as i32 + ((style.margin_px as f32 - layout.font_size) / 2.0).max(0.0) as i32;
    draw_text_mut(
        &mut canvas,
        SHADOW_COLOR,
        layout.x + SHADOW_OFFSET,
        y + SHADOW_OFFSET,
        scale,
        font,
        &layout.text,
    );
    draw_text_mut(&mut canvas, TEXT_COLOR, layout.x, y, scale, font, &layout.text);

    DecodedImage::new(canvas)
}
