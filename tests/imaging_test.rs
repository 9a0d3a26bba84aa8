// 画像の正規化・最適化テスト

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, Luma, LumaA, Rgb, RgbImage, Rgba,
    RgbaImage,
};
use snapmerge::SnapMergeError;
use snapmerge::imaging::DecodedImage;
use snapmerge::imaging::normalize::normalize;
use snapmerge::imaging::optimize::{OptimizeParams, fit_within, optimize, reencode, resize_to_fit};

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).expect("encode test image");
    buf.into_inner()
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = flate2::Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}

/// 8-bit palette PNG with a tRNS chunk. `rows` holds palette indices.
fn indexed_png(palette: &[[u8; 3]], alpha: &[u8], rows: &[&[u8]]) -> Vec<u8> {
    let width = rows[0].len() as u32;
    let height = rows.len() as u32;

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    // bit depth 8, color type 3 (indexed), deflate, no filter, no interlace
    ihdr.extend_from_slice(&[8, 3, 0, 0, 0]);

    let mut raw = Vec::new();
    for row in rows {
        raw.push(0); // filter: None
        raw.extend_from_slice(row);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).unwrap();
    let idat = encoder.finish().unwrap();

    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png_chunk(&mut png, b"IHDR", &ihdr);
    png_chunk(&mut png, b"PLTE", &palette.concat());
    png_chunk(&mut png, b"tRNS", alpha);
    png_chunk(&mut png, b"IDAT", &idat);
    png_chunk(&mut png, b"IEND", &[]);
    png
}

/// Horizontal gradient so lossy encoders have something to discard.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

// ============================================================
// 1. Normalizer
// ============================================================

#[test]
fn test_normalize_rgba_png_composites_on_white() {
    let mut rgba = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    let bytes = encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

    let img = normalize(&bytes, "stamp.png").expect("decode PNG with alpha");
    assert_eq!(img.dimensions(), (4, 4));
    assert_eq!(img.pixels().get_pixel(0, 0), &Rgb([255, 255, 255]));
    assert_eq!(img.pixels().get_pixel(1, 1), &Rgb([255, 0, 0]));
}

#[test]
fn test_normalize_grayscale_becomes_rgb() {
    let gray = GrayImage::from_pixel(3, 2, Luma([100]));
    let bytes = encode(DynamicImage::ImageLuma8(gray), ImageFormat::Png);

    let img = normalize(&bytes, "scan.png").expect("decode grayscale");
    assert_eq!(img.pixels().get_pixel(2, 1), &Rgb([100, 100, 100]));
}

#[test]
fn test_normalize_palette_with_transparency_composites_on_white() {
    // index 0: 透明な赤, index 1: 不透明な青, index 2: 半透明の黒
    let palette = [[255, 0, 0], [0, 0, 255], [0, 0, 0]];
    let alpha = [0, 255, 128];
    let rows: [&[u8]; 2] = [&[0, 1, 2], &[1, 0, 1]];
    let bytes = indexed_png(&palette, &alpha, &rows);

    let img = normalize(&bytes, "stamp.png").expect("decode indexed PNG");
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.pixels().get_pixel(0, 0), &Rgb([255, 255, 255]));
    assert_eq!(img.pixels().get_pixel(1, 1), &Rgb([255, 255, 255]));
    assert_eq!(img.pixels().get_pixel(1, 0), &Rgb([0, 0, 255]));
    assert_eq!(img.pixels().get_pixel(2, 1), &Rgb([0, 0, 255]));
    let half = img.pixels().get_pixel(2, 0);
    assert!((125..=129).contains(&half[0]), "got {half:?}");
    assert_eq!(half[0], half[1]);
    assert_eq!(half[1], half[2]);
}

#[test]
fn test_normalize_gray_alpha_composites_on_white() {
    let mut la = GrayAlphaImage::from_pixel(2, 2, LumaA([40, 255]));
    la.put_pixel(1, 0, LumaA([40, 0]));
    let bytes = encode(DynamicImage::ImageLumaA8(la), ImageFormat::Png);

    let img = normalize(&bytes, "signature.png").expect("decode gray+alpha");
    assert_eq!(img.pixels().get_pixel(0, 0), &Rgb([40, 40, 40]));
    assert_eq!(img.pixels().get_pixel(1, 0), &Rgb([255, 255, 255]));
}

#[test]
fn test_normalize_accepts_any_dimensions() {
    // サイズ制限なし: 1x1 でも 5000x1 でもデコードできれば受理
    let tiny = encode(DynamicImage::ImageRgb8(RgbImage::new(1, 1)), ImageFormat::Png);
    assert!(normalize(&tiny, "dot.png").is_ok());

    let strip = encode(DynamicImage::ImageRgb8(RgbImage::new(5000, 1)), ImageFormat::Png);
    assert_eq!(normalize(&strip, "strip.png").unwrap().dimensions(), (5000, 1));
}

#[test]
fn test_normalize_ignores_misleading_extension() {
    let png = encode(DynamicImage::ImageRgb8(RgbImage::new(2, 2)), ImageFormat::Png);
    assert!(normalize(&png, "actually_png.jpg").is_ok());
}

#[test]
fn test_normalize_corrupt_bytes_is_decode_error() {
    let err = normalize(b"definitely not an image", "C.jpg").unwrap_err();
    assert!(matches!(err, SnapMergeError::DecodeError(_)), "got {err:?}");
    // ファイル名はスキップ記録側が持つので、理由には含めない
    assert!(!err.to_string().contains("C.jpg"), "{err}");
}

#[test]
fn test_normalize_empty_bytes_is_decode_error() {
    assert!(matches!(
        normalize(&[], "empty.png"),
        Err(SnapMergeError::DecodeError(_))
    ));
}

// ============================================================
// 2. Optimizer
// ============================================================

#[test]
fn test_image_at_bound_is_not_resized() {
    let img = DecodedImage::new(gradient(800, 1200));
    let out = resize_to_fit(&img, 800, 1200);
    assert_eq!(out.dimensions(), (800, 1200));
    assert_eq!(out, img, "no resampling when already inside the bound");
}

#[test]
fn test_double_size_image_halves_exactly() {
    let img = DecodedImage::new(gradient(1600, 2400));
    let out = resize_to_fit(&img, 800, 1200);
    assert_eq!(out.dimensions(), (800, 1200));
}

#[test]
fn test_resize_never_exceeds_bound_and_keeps_aspect() {
    let cases = [(2000, 1000), (1000, 3000), (1234, 567), (801, 1201), (3, 5000)];
    for (w, h) in cases {
        let (nw, nh) = fit_within(w, h, 800, 1200);
        assert!(nw <= 800 && nh <= 1200, "{w}x{h} -> {nw}x{nh}");
        // 各辺とも理想値から 1px 未満の誤差
        let scale = f64::min(800.0 / w as f64, 1200.0 / h as f64);
        assert!((nw as f64 - w as f64 * scale).abs() < 1.0, "{w}x{h} -> {nw}x{nh}");
        assert!((nh as f64 - h as f64 * scale).abs() < 1.0, "{w}x{h} -> {nw}x{nh}");
    }
}

#[test]
fn test_resize_is_idempotent_on_small_images() {
    let img = DecodedImage::new(gradient(300, 200));
    let once = resize_to_fit(&img, 800, 1200);
    let twice = resize_to_fit(&once, 800, 1200);
    assert_eq!(once.dimensions(), twice.dimensions());
}

#[test]
fn test_reencode_png_is_lossless() {
    let img = DecodedImage::new(gradient(64, 32));
    let round_trip = reencode(&img, ImageFormat::Png, 50).expect("png round trip");
    assert_eq!(round_trip, img);
}

#[test]
fn test_reencode_jpeg_keeps_dimensions() {
    let img = DecodedImage::new(gradient(64, 32));
    let round_trip = reencode(&img, ImageFormat::Jpeg, 60).expect("jpeg round trip");
    assert_eq!(round_trip.dimensions(), (64, 32));
}

#[test]
fn test_reencode_rejects_invalid_quality() {
    let img = DecodedImage::new(gradient(8, 8));
    assert!(reencode(&img, ImageFormat::Jpeg, 0).is_err());
}

#[test]
fn test_optimize_resizes_then_reencodes() {
    let img = DecodedImage::new(gradient(1600, 2400));
    let params = OptimizeParams {
        max_width: 800,
        max_height: 1200,
        quality: 80,
    };
    let out = optimize(&img, &params).expect("optimize");
    assert_eq!(out.dimensions(), (800, 1200));
}
