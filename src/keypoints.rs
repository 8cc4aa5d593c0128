// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! COCO-style pose keypoints as returned by the pose estimation service.

/// Number of keypoints in a COCO-Pose layout.
pub const NUM_KEYPOINTS: usize = 17;

/// COCO-Pose keypoint names, in service order.
pub const KEYPOINT_NAMES: [&str; NUM_KEYPOINTS] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// Index of a keypoint in the COCO-Pose layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CocoKeypoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl CocoKeypoint {
    /// Position of this keypoint in a pose result.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name of this keypoint.
    #[must_use]
    pub const fn name(self) -> &'static str {
        KEYPOINT_NAMES[self as usize]
    }
}

/// A single 2D keypoint with the service's confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// X coordinate in pixels.
    pub x: f32,
    /// Y coordinate in pixels.
    pub y: f32,
    /// Keypoint confidence (0.0 - 1.0); 0.0 when the service omitted it.
    pub confidence: f32,
}

impl Keypoint {
    /// Create a keypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// The 17 keypoints of one pose, in the coordinate space of the image sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseResult {
    keypoints: [Keypoint; NUM_KEYPOINTS],
}

impl PoseResult {
    /// Create a pose from exactly 17 keypoints.
    #[must_use]
    pub const fn new(keypoints: [Keypoint; NUM_KEYPOINTS]) -> Self {
        Self { keypoints }
    }

    /// Create a pose from a keypoint list.
    ///
    /// # Returns
    ///
    /// * `None` if fewer than 17 keypoints are given; extra keypoints are ignored.
    #[must_use]
    pub fn from_slice(keypoints: &[Keypoint]) -> Option<Self> {
        let keypoints: [Keypoint; NUM_KEYPOINTS] =
            keypoints.get(..NUM_KEYPOINTS)?.try_into().ok()?;
        Some(Self { keypoints })
    }

    /// Get a keypoint by its anatomical index.
    #[must_use]
    pub const fn get(&self, kpt: CocoKeypoint) -> Keypoint {
        self.keypoints[kpt as usize]
    }

    /// Midpoint of two keypoints.
    #[must_use]
    pub fn midpoint(&self, a: CocoKeypoint, b: CocoKeypoint) -> (f32, f32) {
        let (a, b) = (self.get(a), self.get(b));
        ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }

    /// All keypoints in service order.
    #[must_use]
    pub const fn keypoints(&self) -> &[Keypoint; NUM_KEYPOINTS] {
        &self.keypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> Vec<Keypoint> {
        #[allow(clippy::cast_precision_loss)]
        (0..n)
            .map(|i| Keypoint::new(i as f32, (i * 10) as f32, 0.9))
            .collect()
    }

    #[test]
    fn test_keypoint_names() {
        assert_eq!(CocoKeypoint::Nose.name(), "nose");
        assert_eq!(CocoKeypoint::RightShoulder.name(), "right_shoulder");
        assert_eq!(CocoKeypoint::RightAnkle.index(), 16);
        assert_eq!(KEYPOINT_NAMES.len(), NUM_KEYPOINTS);
    }

    #[test]
    fn test_from_slice_requires_seventeen() {
        assert!(PoseResult::from_slice(&sample(16)).is_none());
        assert!(PoseResult::from_slice(&sample(17)).is_some());

        let pose = PoseResult::from_slice(&sample(20)).unwrap();
        assert!((pose.get(CocoKeypoint::RightAnkle).x - 16.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_midpoint() {
        let pose = PoseResult::from_slice(&sample(17)).unwrap();
        let (x, y) = pose.midpoint(CocoKeypoint::LeftHip, CocoKeypoint::RightHip);
        assert!((x - 11.5).abs() < f32::EPSILON);
        assert!((y - 115.0).abs() < f32::EPSILON);
    }
}
