// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Utility functions shared by the rigging pipeline.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::Result;

/// Round float to nearest integer, rounding half to even (Banker's Rounding).
/// This matches the rounding the detection service's reference client uses
/// for keypoints and bounding boxes.
#[must_use]
pub fn bankers_round(v: f32) -> f32 {
    v.round_ties_even()
}

/// Round a pixel coordinate half-to-even and convert it to `i32`.
///
/// Non-finite values map to 0; values beyond `i32` saturate.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_to_pixel(v: f32) -> i32 {
    if v.is_finite() {
        bankers_round(v) as i32
    } else {
        0
    }
}

/// Encode an image as PNG bytes.
///
/// # Errors
///
/// Returns an error if the encoder rejects the pixel layout.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bankers_round() {
        assert!((bankers_round(0.5) - 0.0).abs() < f32::EPSILON);
        assert!((bankers_round(1.5) - 2.0).abs() < f32::EPSILON);
        assert!((bankers_round(2.5) - 2.0).abs() < f32::EPSILON);
        assert!((bankers_round(2.6) - 3.0).abs() < f32::EPSILON);
        assert!((bankers_round(-1.5) + 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_round_to_pixel() {
        assert_eq!(round_to_pixel(149.5), 150);
        assert_eq!(round_to_pixel(150.5), 150);
        assert_eq!(round_to_pixel(f32::NAN), 0);
        assert_eq!(round_to_pixel(f32::INFINITY), 0);
    }

    #[test]
    fn test_encode_png_signature() {
        let image = DynamicImage::new_rgb8(4, 3);
        let bytes = encode_png(&image).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }
}
