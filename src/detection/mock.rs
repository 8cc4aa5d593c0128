// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! In-process [`DetectionService`] replaying fixed answers.

use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;

use super::{DetectionResult, DetectionService};
use crate::keypoints::PoseResult;

/// Detection service that answers from a script and counts every call.
///
/// # Example
///
/// ```rust
/// use character_rig::detection::{DetectionService, ScriptedService};
///
/// let service = ScriptedService::unavailable();
/// assert!(!service.is_service_available());
/// assert_eq!(service.probe_calls(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedService {
    available: bool,
    detection: Option<DetectionResult>,
    pose: Option<PoseResult>,
    probe_calls: AtomicUsize,
    detect_calls: AtomicUsize,
    pose_calls: AtomicUsize,
}

impl ScriptedService {
    /// A service whose liveness probe always fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// A reachable service answering with the given detection and pose.
    #[must_use]
    pub fn available(detection: Option<DetectionResult>, pose: Option<PoseResult>) -> Self {
        Self {
            available: true,
            detection,
            pose,
            ..Self::default()
        }
    }

    /// Number of liveness probes received.
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::Relaxed)
    }

    /// Number of detection requests received.
    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::Relaxed)
    }

    /// Number of pose requests received.
    pub fn pose_calls(&self) -> usize {
        self.pose_calls.load(Ordering::Relaxed)
    }
}

impl DetectionService for ScriptedService {
    fn is_service_available(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::Relaxed);
        self.available
    }

    fn detect(&self, _image: &DynamicImage) -> Option<DetectionResult> {
        self.detect_calls.fetch_add(1, Ordering::Relaxed);
        self.detection
    }

    fn estimate_pose(&self, _image: &DynamicImage) -> Option<PoseResult> {
        self.pose_calls.fetch_add(1, Ordering::Relaxed);
        self.pose.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    #[test]
    fn test_scripted_answers_and_counts() {
        let det = DetectionResult::new(BoundingBox::new(0.0, 0.0, 4.0, 4.0), 0.5);
        let service = ScriptedService::available(Some(det), None);
        let image = DynamicImage::new_rgb8(4, 4);

        assert!(service.is_service_available());
        assert_eq!(service.detect(&image), Some(det));
        assert!(service.estimate_pose(&image).is_none());
        assert_eq!(
            (service.probe_calls(), service.detect_calls(), service.pose_calls()),
            (1, 1, 1)
        );
    }

    #[test]
    fn test_unavailable_has_no_answers() {
        let service = ScriptedService::unavailable();
        assert!(!service.is_service_available());
        assert!(service.detect(&DynamicImage::new_rgb8(1, 1)).is_none());
    }
}
