// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detection and pose estimation capability.
//!
//! The rig assembler reaches the external detection/pose service only through the
//! [`DetectionService`] trait. [`HttpDetectionClient`] talks to the real service over
//! HTTP; [`ScriptedService`] replays fixed answers for tests.
//!
//! Every failure mode (connection refused, timeout, non-success status, malformed
//! payload, empty result set) collapses to `false` / `None`. Callers treat any of
//! them as "use the fallback rig".

mod http;
mod mock;

pub use http::{
    DETECTOR_PATH, HttpDetectionClient, PING_PATH, POSE_PATH, parse_detections, parse_pose,
};
pub use mock::ScriptedService;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

pub use crate::keypoints::PoseResult;
use crate::utils::round_to_pixel;

/// Axis-aligned box in the pixel space of the image sent for detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    /// Create a bounding box from its edges.
    #[must_use]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Whether every edge is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Round the edges half-to-even and clamp them to a `width`x`height` image.
    ///
    /// # Returns
    ///
    /// * `None` if an edge is not finite or the clamped box has no area.
    #[must_use]
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<PixelRect> {
        if !self.is_finite() {
            return None;
        }
        let clamp = |v: f32, max: u32| {
            let max = i32::try_from(max).unwrap_or(i32::MAX);
            u32::try_from(round_to_pixel(v).clamp(0, max)).unwrap_or(0)
        };

        let rect = PixelRect {
            left: clamp(self.left, width),
            top: clamp(self.top, height),
            right: clamp(self.right, width),
            bottom: clamp(self.bottom, height),
        };
        (rect.right > rect.left && rect.bottom > rect.top).then_some(rect)
    }
}

/// Integer crop rectangle; `right` and `bottom` are exclusive.
///
/// Persisted as `bounding_box.yaml` next to an auto-rigged bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    /// Width of the rectangle.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height of the rectangle.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// One detected character candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    pub bounding_box: BoundingBox,
    pub score: f32,
}

impl DetectionResult {
    /// Create a detection result.
    #[must_use]
    pub const fn new(bounding_box: BoundingBox, score: f32) -> Self {
        Self {
            bounding_box,
            score,
        }
    }

    /// Pick the highest scoring candidate.
    ///
    /// Ties keep the earliest candidate and NaN scores never win.
    pub fn best<I>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        candidates
            .into_iter()
            .filter(|c| !c.score.is_nan())
            .fold(None, |best: Option<Self>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    }
}

/// Capability interface of the detection/pose service.
///
/// Implementations never fail loudly: unreachable, slow or confused services
/// answer `false` or `None`.
pub trait DetectionService {
    /// Lightweight liveness probe bounded by a short timeout.
    fn is_service_available(&self) -> bool;

    /// Detect the drawn character in `image` and return the best candidate.
    fn detect(&self, image: &DynamicImage) -> Option<DetectionResult>;

    /// Estimate the 17 keypoints of the character in an already cropped image.
    fn estimate_pose(&self, image: &DynamicImage) -> Option<PoseResult>;
}

impl<S: DetectionService + ?Sized> DetectionService for &S {
    fn is_service_available(&self) -> bool {
        (**self).is_service_available()
    }

    fn detect(&self, image: &DynamicImage) -> Option<DetectionResult> {
        (**self).detect(image)
    }

    fn estimate_pose(&self, image: &DynamicImage) -> Option<PoseResult> {
        (**self).estimate_pose(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(score: f32) -> DetectionResult {
        DetectionResult::new(BoundingBox::new(0.0, 0.0, score * 10.0, 10.0), score)
    }

    #[test]
    fn test_best_picks_highest_score() {
        let best = DetectionResult::best(vec![det(0.3), det(0.9), det(0.5)]).unwrap();
        assert!((best.score - 0.9).abs() < f32::EPSILON);
        assert!(DetectionResult::best(Vec::new()).is_none());
    }

    #[test]
    fn test_best_tie_keeps_first() {
        let a = DetectionResult::new(BoundingBox::new(1.0, 1.0, 5.0, 5.0), 0.7);
        let b = DetectionResult::new(BoundingBox::new(2.0, 2.0, 6.0, 6.0), 0.7);
        assert_eq!(DetectionResult::best(vec![a, b]), Some(a));
    }

    #[test]
    fn test_best_ignores_nan() {
        let best = DetectionResult::best(vec![det(f32::NAN), det(0.1)]).unwrap();
        assert!((best.score - 0.1).abs() < f32::EPSILON);
        assert!(DetectionResult::best(vec![det(f32::NAN)]).is_none());
    }

    #[test]
    fn test_pixel_rect_rounds_and_clamps() {
        let rect = BoundingBox::new(10.5, 11.5, 290.4, 390.6)
            .to_pixel_rect(300, 400)
            .unwrap();
        assert_eq!(
            rect,
            PixelRect {
                left: 10,
                top: 12,
                right: 290,
                bottom: 391
            }
        );
        assert_eq!((rect.width(), rect.height()), (280, 379));

        let rect = BoundingBox::new(-20.0, -5.0, 500.0, 900.0)
            .to_pixel_rect(300, 400)
            .unwrap();
        assert_eq!((rect.left, rect.top, rect.right, rect.bottom), (0, 0, 300, 400));
    }

    #[test]
    fn test_pixel_rect_empty() {
        assert!(BoundingBox::new(50.0, 50.0, 50.2, 80.0).to_pixel_rect(100, 100).is_none());
        assert!(BoundingBox::new(200.0, 0.0, 300.0, 10.0).to_pixel_rect(100, 100).is_none());
        assert!(BoundingBox::new(30.0, 40.0, 10.0, 60.0).to_pixel_rect(100, 100).is_none());
    }

    #[test]
    fn test_pixel_rect_rejects_non_finite_edges() {
        for bad in [
            BoundingBox::new(f32::NAN, 0.0, 10.0, 10.0),
            BoundingBox::new(0.0, f32::NAN, 10.0, 10.0),
            BoundingBox::new(0.0, 0.0, f32::INFINITY, 10.0),
            BoundingBox::new(f32::NEG_INFINITY, 0.0, 10.0, 10.0),
        ] {
            assert!(!bad.is_finite());
            assert!(bad.to_pixel_rect(100, 100).is_none(), "{bad:?}");
        }
        assert!(BoundingBox::new(0.0, 0.0, 10.0, 10.0).is_finite());
    }
}
