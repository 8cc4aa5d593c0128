// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Subject segmentation for tight crops around a detected character.
//!
//! Steps, in order:
//!
//! 1. Darkest-channel luminance, so colored line art reads as ink.
//! 2. Gaussian adaptive threshold, inverted so ink is foreground.
//! 3. Closing then dilation of the ink to join broken strokes.
//! 4. Flood fill from seeds every [`SEED_STEP`] pixels along the border.
//! 5. Everything the fill did not reach is the candidate subject.
//! 6. Holes inside the candidate are filled.
//! 7. The largest connected region is kept; specks and detached artifacts drop out.
//!
//! When step 7 finds nothing, the mask is a plain near-white threshold of the
//! step 1 luminance.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, dilate};
use imageproc::region_labelling::{Connectivity, connected_components};

use super::{BACKGROUND, FOREGROUND, darker_than_near_white};
use crate::verbose;

/// Side of the adaptive threshold window in pixels.
const ADAPTIVE_BLOCK: u16 = 115;

/// Ink must be at least this much darker than its local mean.
const ADAPTIVE_OFFSET: i16 = 8;

/// Stroke closing/dilation radius: two passes of a 3x3 square.
const STROKE_RADIUS: u8 = 2;

/// Spacing of flood-fill seeds along the image border.
const SEED_STEP: usize = 10;

type LabelImage = image::ImageBuffer<Luma<u32>, Vec<u32>>;

pub(super) fn segment(image: &DynamicImage) -> GrayImage {
    let luminance = min_channel(image);
    let strokes = ink_strokes(&luminance);
    let candidate = unreached_by_border_fill(&strokes);
    let filled = fill_holes(&candidate);

    largest_region(&filled).unwrap_or_else(|| {
        verbose!("Segmentation found no enclosed region, using near-white threshold");
        darker_than_near_white(&luminance)
    })
}

fn min_channel(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([r.min(g).min(b)])
    })
}

/// Gaussian sigma equivalent to an odd `block` x `block` window.
fn window_sigma(block: u16) -> f32 {
    0.3 * ((f32::from(block) - 1.0) * 0.5 - 1.0) + 0.8
}

fn ink_strokes(luminance: &GrayImage) -> GrayImage {
    let local_mean = gaussian_blur_f32(luminance, window_sigma(ADAPTIVE_BLOCK));
    let ink = GrayImage::from_fn(luminance.width(), luminance.height(), |x, y| {
        let value = i16::from(luminance.get_pixel(x, y).0[0]);
        let threshold = i16::from(local_mean.get_pixel(x, y).0[0]) - ADAPTIVE_OFFSET;
        if value > threshold {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    });

    let closed = close(&ink, Norm::LInf, STROKE_RADIUS);
    dilate(&closed, Norm::LInf, STROKE_RADIUS)
}

fn label_count(labels: &LabelImage) -> usize {
    labels.pixels().map(|p| p.0[0] as usize).max().unwrap_or(0) + 1
}

fn border_seeds(width: u32, height: u32) -> Vec<(u32, u32)> {
    let mut seeds = Vec::new();
    for x in (0..width.saturating_sub(1)).step_by(SEED_STEP) {
        seeds.push((x, 0));
        seeds.push((x, height - 1));
    }
    for y in (0..height.saturating_sub(1)).step_by(SEED_STEP) {
        seeds.push((0, y));
        seeds.push((width - 1, y));
    }
    seeds
}

fn on_border(x: u32, y: u32, width: u32, height: u32) -> bool {
    x == 0 || y == 0 || x + 1 == width || y + 1 == height
}

/// Pixels a 4-connected fill from the border seeds cannot reach through the strokes.
/// The one pixel image frame always counts as reached.
fn unreached_by_border_fill(strokes: &GrayImage) -> GrayImage {
    let (width, height) = strokes.dimensions();
    let open = GrayImage::from_fn(width, height, |x, y| {
        if strokes.get_pixel(x, y).0[0] == BACKGROUND {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    });
    let labels = connected_components(&open, Connectivity::Four, Luma([BACKGROUND]));

    let mut reached = vec![false; label_count(&labels)];
    for (x, y) in border_seeds(width, height) {
        let label = labels.get_pixel(x, y).0[0] as usize;
        if label != 0 {
            reached[label] = true;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        if on_border(x, y, width, height) || (label != 0 && reached[label]) {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    })
}

/// Fill background regions that do not touch the image border.
fn fill_holes(region: &GrayImage) -> GrayImage {
    let (width, height) = region.dimensions();
    let gaps = GrayImage::from_fn(width, height, |x, y| {
        if region.get_pixel(x, y).0[0] == BACKGROUND {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    });
    let labels = connected_components(&gaps, Connectivity::Four, Luma([BACKGROUND]));

    let mut outside = vec![false; label_count(&labels)];
    for (x, y, p) in labels.enumerate_pixels() {
        if on_border(x, y, width, height) {
            outside[p.0[0] as usize] = true;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        if region.get_pixel(x, y).0[0] != BACKGROUND || (label != 0 && !outside[label]) {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

/// Keep only the largest 8-connected foreground region. Ties keep the region
/// met first in raster order.
fn largest_region(region: &GrayImage) -> Option<GrayImage> {
    let labels = connected_components(region, Connectivity::Eight, Luma([BACKGROUND]));

    let mut areas = vec![0usize; label_count(&labels)];
    for p in labels.pixels() {
        areas[p.0[0] as usize] += 1;
    }

    let (best, _) = areas
        .iter()
        .enumerate()
        .skip(1)
        .filter(|&(_, &area)| area > 0)
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;

    Some(GrayImage::from_fn(region.width(), region.height(), |x, y| {
        if labels.get_pixel(x, y).0[0] as usize == best {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    }))
}
