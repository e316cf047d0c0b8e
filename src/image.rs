//! # Photo Normalization
//!
//! Uploaded photos arrive in whatever format and size the evaluator's
//! camera produced. Before they enter a report they are decoded, scaled
//! down to an 800-unit bounding box (never up), and re-encoded as JPEG at
//! a fixed quality, which bounds both the report size and the memory a
//! render pass holds at once.
//!
//! The same proportional-fit rule, parameterized by the target box, decides
//! the display size of a photo on the page (200×150 in the single report,
//! 150×150 in the overview).

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, GenericImageView};

use crate::error::ImageError;

/// Longest edge of a normalized photo, in pixels.
pub const MAX_DIMENSION: u32 = 800;

/// JPEG quality factor for re-encoding (0–100).
pub const JPEG_QUALITY: u8 = 70;

/// A decoded, resized, re-encoded photo ready for embedding.
#[derive(Debug, Clone)]
pub struct NormalizedPhoto {
    /// JPEG bytes at [`JPEG_QUALITY`].
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode raw image bytes, scale them into the 800-unit bounding box and
/// re-encode as JPEG.
///
/// Fails with [`ImageError::Decode`] when the input is not a decodable
/// raster image. The source bytes are never mutated.
pub fn normalize(bytes: &[u8]) -> Result<NormalizedPhoto, ImageError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;

    let (width, height) = (decoded.width(), decoded.height());
    let (target_w, target_h) = scaled_dimensions(width, height);
    let scaled = if (target_w, target_h) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    let rgb = scaled.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(rgb.as_raw(), target_w, target_h, ColorType::Rgb8)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    Ok(NormalizedPhoto {
        jpeg,
        width: target_w,
        height: target_h,
    })
}

/// Target pixel dimensions for the 800-unit bounding box.
///
/// The binding dimension is the larger of the two; only when it exceeds
/// [`MAX_DIMENSION`] are both sides scaled by the same factor. Square
/// images bind on either side with the same result.
fn scaled_dimensions(width: u32, height: u32) -> (u32, u32) {
    let max = MAX_DIMENSION as f64;
    if width >= height {
        if width > MAX_DIMENSION {
            let scaled = (height as f64 * max / width as f64).round() as u32;
            return (MAX_DIMENSION, scaled.max(1));
        }
    } else if height > MAX_DIMENSION {
        let scaled = (width as f64 * max / height as f64).round() as u32;
        return (scaled.max(1), MAX_DIMENSION);
    }
    (width, height)
}

/// Display size (points) for a photo of `width`×`height` pixels fitted into
/// a `box_w`×`box_h` box: width-first, then capped by the box height, aspect
/// ratio preserved throughout.
pub fn fit_box(width: u32, height: u32, box_w: f64, box_h: f64) -> (f64, f64) {
    let mut display_w = box_w;
    let mut display_h = height as f64 * box_w / width as f64;
    if display_h > box_h {
        display_h = box_h;
        display_w = width as f64 * box_h / height as f64;
    }
    (display_w, display_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, ColorType::Rgb8)
            .unwrap();
        buf
    }

    #[test]
    fn test_wide_image_binds_on_width() {
        assert_eq!(scaled_dimensions(1600, 800), (800, 400));
        assert_eq!(scaled_dimensions(1000, 750), (800, 600));
    }

    #[test]
    fn test_tall_image_binds_on_height() {
        assert_eq!(scaled_dimensions(600, 1200), (400, 800));
    }

    #[test]
    fn test_small_image_is_untouched() {
        assert_eq!(scaled_dimensions(640, 480), (640, 480));
        assert_eq!(scaled_dimensions(800, 800), (800, 800));
    }

    #[test]
    fn test_aspect_ratio_preserved_within_rounding() {
        let (w, h) = scaled_dimensions(1337, 901);
        assert_eq!(w, 800);
        let expected = (901.0 * 800.0 / 1337.0_f64).round() as u32;
        assert_eq!(h, expected);
    }

    #[test]
    fn test_normalize_downscales_and_reencodes() {
        let photo = normalize(&jpeg_bytes(1600, 900)).unwrap();
        assert_eq!(photo.width, 800);
        assert_eq!(photo.height, 450);
        assert!(photo.jpeg.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_normalize_keeps_small_dimensions() {
        let photo = normalize(&jpeg_bytes(320, 240)).unwrap();
        assert_eq!((photo.width, photo.height), (320, 240));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(
            normalize(b"definitely not an image"),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn test_fit_box_width_first() {
        // 400x200 into 200x150: width rules, height follows
        assert_eq!(fit_box(400, 200, 200.0, 150.0), (200.0, 100.0));
    }

    #[test]
    fn test_fit_box_height_cap() {
        // 200x400 into 200x150: width-first overflows, height caps
        let (w, h) = fit_box(200, 400, 200.0, 150.0);
        assert_eq!(h, 150.0);
        assert!((w - 75.0).abs() < 1e-9);
    }
}
