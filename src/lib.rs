// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Character Rig
//!
//! Turns a raster image of a drawn or rendered character into an animation rig:
//! a binary foreground mask, a named 16-joint skeleton and a normalized
//! texture/thumbnail pair, ready for a 2D skeletal animation renderer.
//!
//! ## Features
//!
//! - **Two-Tier Rigging** - Detection, pose estimation and crop segmentation when a
//!   detection service is reachable; threshold mask and proportional skeleton otherwise
//! - **Always Completes** - Every decodable image of nonzero size yields a full bundle
//! - **Deterministic** - Identical input and service answers give byte-identical files
//! - **Pluggable Service** - The detection/pose service sits behind [`DetectionService`]
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use character_rig::{RigAssembler, RigConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RigConfig::from_env().with_thumbnail_size(256);
//!     let assembler = RigAssembler::from_config(config)?;
//!
//!     let bundle = assembler.rig(&"character.png".into())?;
//!     println!(
//!         "{} rig, {} joints, {} foreground pixels",
//!         bundle.path,
//!         bundle.skeleton.len(),
//!         bundle.mask.foreground_count()
//!     );
//!
//!     bundle.save("characters/hero")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing Without a Service
//!
//! ```rust
//! use character_rig::detection::ScriptedService;
//! use character_rig::{RigAssembler, RigConfig, RigPath};
//! use image::DynamicImage;
//!
//! let assembler = RigAssembler::new(RigConfig::new(), ScriptedService::unavailable())?;
//! let bundle = assembler.rig_image(&DynamicImage::new_rgb8(400, 600))?;
//!
//! assert_eq!(bundle.path, RigPath::Simple);
//! assert_eq!(bundle.skeleton.root().map(|j| j.loc), Some([200, 330]));
//! # Ok::<(), character_rig::RigError>(())
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Simple rig from a single image
//! character-rig prepare --input hero.png --output characters/hero
//!
//! # Try the detection service first
//! character-rig prepare -i hero.png -o characters/hero --auto-rig --service-url http://localhost:8080
//!
//! # Check whether the service answers
//! character-rig probe --service-url http://localhost:8080
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`assembler`] | [`RigAssembler`] and the fallback state machine |
//! | [`bundle`] | [`RigBundle`] and the on-disk layout |
//! | [`mask`] | Alpha/threshold masks and crop segmentation |
//! | [`skeleton`] | The 16-joint hierarchy from keypoints or proportions |
//! | [`detection`] | [`DetectionService`], the HTTP client and a scripted double |
//! | [`thumbnail`] | Scale-to-fit resizing |
//! | [`config`] | [`RigConfig`] |
//! | [`error`] | Error types ([`RigError`], [`Result`]) |
//!
//! ## License
//!
//! This project is dual-licensed under [AGPL-3.0](https://www.gnu.org/licenses/agpl-3.0.html)
//! for open-source use or [Ultralytics Enterprise License](https://ultralytics.com/license)
//! for commercial applications.

// Modules
pub mod assembler;
pub mod bundle;
pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod keypoints;
pub mod mask;
pub mod skeleton;
pub mod source;
pub mod thumbnail;
pub mod utils;

// Re-export main types for convenience
pub use assembler::RigAssembler;
pub use bundle::{CharacterConfig, RigBundle, RigPath};
pub use config::RigConfig;
pub use detection::{
    BoundingBox, DetectionResult, DetectionService, HttpDetectionClient, PixelRect,
};
pub use error::{Result, RigError};
pub use keypoints::{CocoKeypoint, Keypoint, PoseResult};
pub use mask::Mask;
pub use skeleton::{Joint, JointId, JointSource, Skeleton};
pub use source::Source;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "character-rig");
    }
}
