// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton synthesis.
//!
//! Every rig uses the same 16-joint humanoid hierarchy. Only the joint coordinates
//! depend on where they come from: pose keypoints from the detection service, or
//! fixed proportions of the image size when no keypoints are available. Both
//! sources feed [`Skeleton::build`], so the names and parent topology are declared
//! exactly once in [`JointId`].
//!
//! Keypoint mapping (COCO index → joint), kept stable for downstream retargeting:
//!
//! | Joint | Keypoints |
//! |-------|-----------|
//! | `root`, `hip` | midpoint of 11 and 12 |
//! | `torso` | midpoint of 5 and 6 |
//! | `neck` | 0 |
//! | `right_shoulder`, `right_elbow`, `right_hand` | 6, 8, 10 |
//! | `left_shoulder`, `left_elbow`, `left_hand` | 5, 7, 9 |
//! | `right_hip`, `right_knee`, `right_foot` | 12, 14, 16 |
//! | `left_hip`, `left_knee`, `left_foot` | 11, 13, 15 |

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};
use crate::keypoints::{CocoKeypoint, PoseResult};
use crate::utils::round_to_pixel;

/// Number of joints in every produced skeleton.
pub const NUM_JOINTS: usize = 16;

/// Pixel offset of an elbow from its shoulder in the proportional skeleton.
const ELBOW_OFFSET: (i64, i64) = (20, 30);

/// Pixel offset of a hand from its shoulder in the proportional skeleton.
const HAND_OFFSET: (i64, i64) = (40, 60);

/// The joints of the humanoid hierarchy, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointId {
    Root,
    Hip,
    Torso,
    Neck,
    RightShoulder,
    RightElbow,
    RightHand,
    LeftShoulder,
    LeftElbow,
    LeftHand,
    RightHip,
    RightKnee,
    RightFoot,
    LeftHip,
    LeftKnee,
    LeftFoot,
}

impl JointId {
    /// All joints in canonical hierarchy-declaration order. Parents precede children.
    pub const ALL: [Self; NUM_JOINTS] = [
        Self::Root,
        Self::Hip,
        Self::Torso,
        Self::Neck,
        Self::RightShoulder,
        Self::RightElbow,
        Self::RightHand,
        Self::LeftShoulder,
        Self::LeftElbow,
        Self::LeftHand,
        Self::RightHip,
        Self::RightKnee,
        Self::RightFoot,
        Self::LeftHip,
        Self::LeftKnee,
        Self::LeftFoot,
    ];

    /// Joint name as written to the character config.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Hip => "hip",
            Self::Torso => "torso",
            Self::Neck => "neck",
            Self::RightShoulder => "right_shoulder",
            Self::RightElbow => "right_elbow",
            Self::RightHand => "right_hand",
            Self::LeftShoulder => "left_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::LeftHand => "left_hand",
            Self::RightHip => "right_hip",
            Self::RightKnee => "right_knee",
            Self::RightFoot => "right_foot",
            Self::LeftHip => "left_hip",
            Self::LeftKnee => "left_knee",
            Self::LeftFoot => "left_foot",
        }
    }

    /// Parent joint, `None` only for the root.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Root => None,
            Self::Hip | Self::RightHip | Self::LeftHip => Some(Self::Root),
            Self::Torso => Some(Self::Hip),
            Self::Neck | Self::RightShoulder | Self::LeftShoulder => Some(Self::Torso),
            Self::RightElbow => Some(Self::RightShoulder),
            Self::RightHand => Some(Self::RightElbow),
            Self::LeftElbow => Some(Self::LeftShoulder),
            Self::LeftHand => Some(Self::LeftElbow),
            Self::RightKnee => Some(Self::RightHip),
            Self::RightFoot => Some(Self::RightKnee),
            Self::LeftKnee => Some(Self::LeftHip),
            Self::LeftFoot => Some(Self::LeftKnee),
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named joint at a pixel location.
///
/// Serializes as `{loc, name, parent}`, the joint schema of `char_cfg.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joint {
    /// Location `[x, y]` in pixel coordinates of the skeleton's image space.
    pub loc: [i32; 2],
    /// Name, unique within a skeleton.
    pub name: String,
    /// Name of the parent joint; `None` for the root.
    pub parent: Option<String>,
}

/// Where joint coordinates come from.
#[derive(Debug, Clone, Copy)]
pub enum JointSource<'a> {
    /// Keypoints returned by the pose service.
    FromKeypoints(&'a PoseResult),
    /// Fixed fractions of the image size.
    FromProportions {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
}

impl JointSource<'_> {
    /// Location of a joint under this source.
    #[must_use]
    pub fn locate(&self, joint: JointId) -> [i32; 2] {
        match *self {
            Self::FromKeypoints(pose) => locate_from_pose(pose, joint),
            Self::FromProportions { width, height } => {
                Proportions::new(width, height).locate(joint)
            }
        }
    }
}

fn locate_from_pose(pose: &PoseResult, joint: JointId) -> [i32; 2] {
    use CocoKeypoint as K;

    let at = |kpt: K| {
        let p = pose.get(kpt);
        (p.x, p.y)
    };
    let (x, y) = match joint {
        JointId::Root | JointId::Hip => pose.midpoint(K::LeftHip, K::RightHip),
        JointId::Torso => pose.midpoint(K::LeftShoulder, K::RightShoulder),
        JointId::Neck => at(K::Nose),
        JointId::RightShoulder => at(K::RightShoulder),
        JointId::RightElbow => at(K::RightElbow),
        JointId::RightHand => at(K::RightWrist),
        JointId::LeftShoulder => at(K::LeftShoulder),
        JointId::LeftElbow => at(K::LeftElbow),
        JointId::LeftHand => at(K::LeftWrist),
        JointId::RightHip => at(K::RightHip),
        JointId::RightKnee => at(K::RightKnee),
        JointId::RightFoot => at(K::RightAnkle),
        JointId::LeftHip => at(K::LeftHip),
        JointId::LeftKnee => at(K::LeftKnee),
        JointId::LeftFoot => at(K::LeftAnkle),
    };
    [round_to_pixel(x), round_to_pixel(y)]
}

/// Body landmarks of the proportional skeleton, in whole pixels.
struct Proportions {
    cx: i64,
    neck_y: i64,
    torso_y: i64,
    hip_y: i64,
    knee_y: i64,
    foot_y: i64,
    shoulder_offset: i64,
    hip_offset: i64,
}

impl Proportions {
    fn new(width: u32, height: u32) -> Self {
        let (w, h) = (i64::from(width), i64::from(height));
        let pct = |v: i64, p: i64| v * p / 100;
        Self {
            cx: w / 2,
            neck_y: pct(h, 22),
            torso_y: pct(h, 40),
            hip_y: pct(h, 55),
            knee_y: pct(h, 75),
            foot_y: pct(h, 95),
            shoulder_offset: pct(w, 20),
            hip_offset: pct(w, 10),
        }
    }

    fn locate(&self, joint: JointId) -> [i32; 2] {
        let (x, y) = match joint {
            JointId::Root | JointId::Hip => (self.cx, self.hip_y),
            JointId::Torso => (self.cx, self.torso_y),
            JointId::Neck => (self.cx, self.neck_y),
            JointId::RightShoulder => (self.cx - self.shoulder_offset, self.torso_y),
            JointId::RightElbow => (
                self.cx - self.shoulder_offset - ELBOW_OFFSET.0,
                self.torso_y + ELBOW_OFFSET.1,
            ),
            JointId::RightHand => (
                self.cx - self.shoulder_offset - HAND_OFFSET.0,
                self.torso_y + HAND_OFFSET.1,
            ),
            JointId::LeftShoulder => (self.cx + self.shoulder_offset, self.torso_y),
            JointId::LeftElbow => (
                self.cx + self.shoulder_offset + ELBOW_OFFSET.0,
                self.torso_y + ELBOW_OFFSET.1,
            ),
            JointId::LeftHand => (
                self.cx + self.shoulder_offset + HAND_OFFSET.0,
                self.torso_y + HAND_OFFSET.1,
            ),
            JointId::RightHip => (self.cx - self.hip_offset, self.hip_y),
            JointId::RightKnee => (self.cx - self.hip_offset, self.knee_y),
            JointId::RightFoot => (self.cx - self.hip_offset, self.foot_y),
            JointId::LeftHip => (self.cx + self.hip_offset, self.hip_y),
            JointId::LeftKnee => (self.cx + self.hip_offset, self.knee_y),
            JointId::LeftFoot => (self.cx + self.hip_offset, self.foot_y),
        };
        [saturate(x), saturate(y)]
    }
}

#[allow(clippy::cast_possible_truncation)]
fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// An ordered joint hierarchy plus the size of the image space its coordinates live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    /// Width of the coordinate space in pixels.
    pub width: u32,
    /// Height of the coordinate space in pixels.
    pub height: u32,
    /// Joints in hierarchy-declaration order.
    pub joints: Vec<Joint>,
}

impl Skeleton {
    /// Build the humanoid hierarchy with coordinates from `source`.
    #[must_use]
    pub fn build(source: JointSource<'_>, width: u32, height: u32) -> Self {
        let joints = JointId::ALL
            .iter()
            .map(|&id| Joint {
                name: id.as_str().to_string(),
                loc: source.locate(id),
                parent: id.parent().map(|p| p.as_str().to_string()),
            })
            .collect();

        Self {
            width,
            height,
            joints,
        }
    }

    /// Skeleton from pose keypoints, expressed in a `width` x `height` image.
    ///
    /// Coordinates are rounded half-to-even to whole pixels.
    #[must_use]
    pub fn from_pose(pose: &PoseResult, width: u32, height: u32) -> Self {
        Self::build(JointSource::FromKeypoints(pose), width, height)
    }

    /// Proportional skeleton for a `width` x `height` image. Never fails.
    #[must_use]
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::build(JointSource::FromProportions { width, height }, width, height)
    }

    /// Look up a joint by name.
    #[must_use]
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// The root joint (the one without a parent).
    #[must_use]
    pub fn root(&self) -> Option<&Joint> {
        self.joints.iter().find(|j| j.parent.is_none())
    }

    /// Number of joints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Check if the skeleton has no joints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Check the tree invariant: unique names, exactly one root, every parent
    /// exists and the parent graph is acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::ConfigError`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let mut parents: HashMap<&str, Option<&str>> = HashMap::with_capacity(self.joints.len());
        for joint in &self.joints {
            if parents
                .insert(joint.name.as_str(), joint.parent.as_deref())
                .is_some()
            {
                return Err(RigError::ConfigError(format!(
                    "duplicate joint name '{}'",
                    joint.name
                )));
            }
        }

        let roots = self.joints.iter().filter(|j| j.parent.is_none()).count();
        if roots != 1 {
            return Err(RigError::ConfigError(format!(
                "skeleton must have exactly one root, found {roots}"
            )));
        }

        for joint in &self.joints {
            if let Some(parent) = joint.parent.as_deref()
                && !parents.contains_key(parent)
            {
                return Err(RigError::ConfigError(format!(
                    "joint '{}' references missing parent '{parent}'",
                    joint.name
                )));
            }

            // Walking up must reach the root within `len` steps.
            let mut current = joint.parent.as_deref();
            let mut steps = 0;
            while let Some(name) = current {
                steps += 1;
                if steps > self.joints.len() {
                    return Err(RigError::ConfigError(format!(
                        "cycle in parent chain of joint '{}'",
                        joint.name
                    )));
                }
                current = parents.get(name).copied().flatten();
            }
        }

        Ok(())
    }
}
