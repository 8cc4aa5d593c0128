// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Foreground mask extraction.
//!
//! Two modes are available:
//!
//! - [`Mask::from_image`] thresholds the alpha channel when there is one, or
//!   separates a drawn subject from a light background otherwise. Used by the
//!   fallback rig on the full image.
//! - [`Mask::segment`] runs adaptive thresholding, border flood fill and
//!   largest-region selection on a tight crop around the subject. Used only after
//!   a successful detection.
//!
//! Both are deterministic: identical pixels give a bit-identical mask.

mod segment;

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate};

use crate::source::has_alpha;

/// Foreground value of a mask pixel.
pub const FOREGROUND: u8 = 255;

/// Background value of a mask pixel.
pub const BACKGROUND: u8 = 0;

/// Alpha values above this are foreground (midpoint of the 8-bit range).
pub const ALPHA_THRESHOLD: u8 = 128;

/// Gray values above this are considered near-white background.
pub const NEAR_WHITE: u8 = 240;

/// Closing radius of the threshold refinement: two passes of a 5x5 square.
const CLOSE_RADIUS: u8 = 4;

/// Dilation radius of the threshold refinement: one pass of a 5x5 square.
const DILATE_RADIUS: u8 = 2;

/// Binary foreground mask with the same size as the image it was derived from.
///
/// Every pixel is exactly [`FOREGROUND`] or [`BACKGROUND`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: GrayImage,
}

impl Mask {
    /// Build a mask from a gray image; any nonzero pixel becomes foreground.
    #[must_use]
    pub fn from_binary(mut image: GrayImage) -> Self {
        for p in image.pixels_mut() {
            p.0[0] = if p.0[0] > 0 { FOREGROUND } else { BACKGROUND };
        }
        Self { data: image }
    }

    /// Mask from an alpha channel or, for opaque images, a near-white threshold.
    ///
    /// With alpha, foreground is `alpha > 128`. Without alpha, the image is
    /// converted to gray and every pixel not brighter than the near-white cutoff
    /// is foreground. Either raw mask is then closed to seal small gaps in outlines
    /// and dilated so anti-aliased edges are retained.
    #[must_use]
    pub fn from_image(image: &DynamicImage) -> Self {
        let raw = if has_alpha(image) {
            alpha_threshold(image)
        } else {
            darker_than_near_white(&image.to_luma8())
        };
        Self::from_binary(refine(&raw))
    }

    /// Segment the subject of a tight crop around a detected character.
    ///
    /// Falls back to a near-white threshold of the darkest-channel image when no
    /// enclosed region is found, so this never fails.
    #[must_use]
    pub fn segment(cropped: &DynamicImage) -> Self {
        Self::from_binary(segment::segment(cropped))
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.data.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.data.height()
    }

    /// Mask dimensions as (width, height).
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.data.dimensions()
    }

    /// Whether the pixel at (x, y) is foreground. Out-of-bounds pixels are background.
    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.data
            .get_pixel_checked(x, y)
            .is_some_and(|p| p.0[0] == FOREGROUND)
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.data.pixels().filter(|p| p.0[0] == FOREGROUND).count()
    }

    /// Borrow the mask as a single-channel image.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.data
    }

    /// Convert the mask into a single-channel image.
    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.data
    }
}

fn alpha_threshold(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if rgba.get_pixel(x, y).0[3] > ALPHA_THRESHOLD {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

/// Inverse binary threshold at the near-white cutoff.
pub(crate) fn darker_than_near_white(gray: &GrayImage) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > NEAR_WHITE {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    })
}

fn refine(raw: &GrayImage) -> GrayImage {
    let closed = close(raw, Norm::LInf, CLOSE_RADIUS);
    dilate(&closed, Norm::LInf, DILATE_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn is_binary(mask: &Mask) -> bool {
        mask.as_image()
            .pixels()
            .all(|p| p.0[0] == FOREGROUND || p.0[0] == BACKGROUND)
    }

    #[test]
    fn test_from_binary_normalizes() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([u8::try_from(x).unwrap()]));
        let mask = Mask::from_binary(gray);
        assert!(!mask.is_foreground(0, 0));
        assert!(mask.is_foreground(1, 0));
        assert!(mask.is_foreground(2, 0));
        assert!(!mask.is_foreground(5, 5));
        assert_eq!(mask.foreground_count(), 2);
    }

    #[test]
    fn test_alpha_mode_dimensions_and_binary() {
        let rgba = RgbaImage::from_fn(37, 23, |x, y| {
            Rgba([12, 200, 40, u8::try_from((x * 7 + y * 3) % 256).unwrap()])
        });
        let mask = Mask::from_image(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(mask.dimensions(), (37, 23));
        assert!(is_binary(&mask));
    }

    #[test]
    fn test_alpha_mode_square() {
        // Opaque square in a transparent field
        let rgba = RgbaImage::from_fn(60, 60, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let mask = Mask::from_image(&DynamicImage::ImageRgba8(rgba));

        assert!(mask.is_foreground(30, 30));
        assert!(mask.is_foreground(20, 20));
        // Dilation grows the edge by at most the dilation radius.
        assert!(mask.is_foreground(18, 30));
        assert!(!mask.is_foreground(17, 30));
        assert!(!mask.is_foreground(5, 5));
    }

    #[test]
    fn test_threshold_mode_ignores_near_white() {
        let rgb = RgbImage::from_fn(50, 50, |x, y| {
            if (10..40).contains(&x) && (10..40).contains(&y) {
                Rgb([30, 30, 30])
            } else {
                Rgb([250, 250, 250])
            }
        });
        let mask = Mask::from_image(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(mask.dimensions(), (50, 50));
        assert!(is_binary(&mask));
        assert!(mask.is_foreground(25, 25));
        assert!(!mask.is_foreground(2, 2));
        assert!(!mask.is_foreground(47, 25));
    }

    #[test]
    fn test_threshold_mode_closes_gaps() {
        // Two strokes separated by a one pixel gap are joined by closing.
        let gray = GrayImage::from_fn(30, 11, |x, y| {
            if y == 5 && x != 15 && (5..25).contains(&x) {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let mask = Mask::from_image(&DynamicImage::ImageLuma8(gray));
        assert!(mask.is_foreground(15, 5));
    }

    #[test]
    fn test_white_image_is_empty() {
        let rgb = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
        let mask = Mask::from_image(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(mask.foreground_count(), 0);
    }
}
