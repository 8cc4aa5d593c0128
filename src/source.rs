// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Source image handling.
//!
//! A [`Source`] names where a character image comes from. Loading it is the only
//! step of rig construction that can fail for a well-formed configuration: an
//! unreadable or undecodable source is reported as [`RigError::DecodeError`].

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::error::{Result, RigError};

/// Represents the input image of one rig-construction call.
#[derive(Debug, Clone)]
pub enum Source {
    /// Path to an image file.
    Image(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    /// Already decoded image.
    Buffer(DynamicImage),
}

impl Source {
    /// Get the path if this source has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Image(p) => Some(p),
            _ => None,
        }
    }

    /// Load and decode the source image.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::DecodeError`] if the file cannot be read, the bytes are
    /// not a supported image format, or the image has a zero dimension.
    pub fn load(&self) -> Result<DynamicImage> {
        let image = match self {
            Self::Image(path) => image::open(path).map_err(|e| {
                RigError::DecodeError(format!("Failed to load {}: {e}", path.display()))
            })?,
            Self::Bytes(bytes) => image::load_from_memory(bytes)
                .map_err(|e| RigError::DecodeError(format!("Failed to decode image bytes: {e}")))?,
            Self::Buffer(image) => image.clone(),
        };

        ensure_nonzero(&image)?;
        Ok(image)
    }
}

/// Reject images with a zero dimension.
///
/// # Errors
///
/// Returns [`RigError::DecodeError`] if the width or height is zero.
pub fn ensure_nonzero(image: &DynamicImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RigError::DecodeError(format!(
            "Image has zero size ({width}x{height})"
        )));
    }
    Ok(())
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::Image(PathBuf::from(s))
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::Image(PathBuf::from(s))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Image(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::Image(path.to_path_buf())
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<DynamicImage> for Source {
    fn from(img: DynamicImage) -> Self {
        Self::Buffer(img)
    }
}

/// Number of channels in an image: 1 (gray), 2 (gray + alpha), 3 (color) or 4 (color + alpha).
#[must_use]
pub fn channel_count(image: &DynamicImage) -> u8 {
    image.color().channel_count()
}

/// Whether the image carries an alpha channel.
#[must_use]
pub fn has_alpha(image: &DynamicImage) -> bool {
    image.color().has_alpha()
}

/// Normalize any image to 8-bit RGBA.
///
/// Gray values are replicated across the color channels and images without
/// alpha become fully opaque.
#[must_use]
pub fn to_rgba(image: &DynamicImage) -> RgbaImage {
    image.to_rgba8()
}
