// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Scale-to-fit resizing of RGBA images.
//!
//! Provides the square preview thumbnail of a rig bundle and the downscale applied
//! before an image is sent for detection. Both use `fast_image_resize`.

use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::{RgbaImage, imageops};

use crate::error::{Result, RigError};
use crate::utils::bankers_round;

/// Placement of a scaled image inside a square canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitParams {
    /// Scaled width.
    pub width: u32,
    /// Scaled height.
    pub height: u32,
    /// Horizontal offset of the scaled image in the canvas.
    pub offset_x: u32,
    /// Vertical offset of the scaled image in the canvas.
    pub offset_y: u32,
}

/// Compute the size and centered offset of a `width`x`height` image scaled by
/// `min(size / width, size / height)` into a `size`x`size` canvas.
///
/// Scaled sides are rounded half-to-even and never drop below one pixel.
#[must_use]
pub fn fit_params(width: u32, height: u32, size: u32) -> FitParams {
    let (new_w, new_h) = scaled_dimensions(width, height, size, size);
    FitParams {
        width: new_w,
        height: new_h,
        offset_x: size.saturating_sub(new_w) / 2,
        offset_y: size.saturating_sub(new_h) / 2,
    }
}

fn scaled_dimensions(width: u32, height: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    #[allow(clippy::cast_precision_loss)]
    let scale = (target_w as f32 / w).min(target_h as f32 / h);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_w = bankers_round(w * scale) as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_h = bankers_round(h * scale) as u32;

    (new_w.clamp(1, target_w.max(1)), new_h.clamp(1, target_h.max(1)))
}

/// Resize an RGBA image to exactly `width`x`height`.
///
/// # Errors
///
/// Returns [`RigError::ImageError`] if the resizer rejects the buffers.
pub fn resize_rgba(
    image: &RgbaImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<RgbaImage> {
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }

    let src = Image::from_vec_u8(
        image.width(),
        image.height(),
        image.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| RigError::ImageError(format!("Failed to wrap source image: {e}")))?;
    let mut dst = Image::new(width, height, PixelType::U8x4);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(filter));
    resizer
        .resize(&src, &mut dst, Some(&options))
        .map_err(|e| RigError::ImageError(format!("Failed to resize image: {e}")))?;

    RgbaImage::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| RigError::ImageError("Resized buffer has the wrong length".to_string()))
}

/// Scale a texture into a transparent `size`x`size` square, centered.
///
/// # Errors
///
/// Returns [`RigError::ImageError`] if `size` is zero or resizing fails.
pub fn make_thumbnail(texture: &RgbaImage, size: u32) -> Result<RgbaImage> {
    if size == 0 {
        return Err(RigError::ImageError(
            "Thumbnail size must be greater than zero".to_string(),
        ));
    }

    let fit = fit_params(texture.width(), texture.height(), size);
    // Box averaging for area downsampling.
    let scaled = resize_rgba(texture, fit.width, fit.height, FilterType::Box)?;

    let mut canvas = RgbaImage::new(size, size);
    imageops::replace(
        &mut canvas,
        &scaled,
        i64::from(fit.offset_x),
        i64::from(fit.offset_y),
    );
    Ok(canvas)
}

/// Downscale an image so its longest side is at most `max_side`.
///
/// Images already within the limit are returned unchanged.
///
/// # Errors
///
/// Returns [`RigError::ImageError`] if resizing fails.
pub fn limit_longest_side(image: &RgbaImage, max_side: u32) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    if width.max(height) <= max_side {
        return Ok(image.clone());
    }
    let (new_w, new_h) = scaled_dimensions(width, height, max_side, max_side);
    resize_rgba(image, new_w, new_h, FilterType::Bilinear)
}
