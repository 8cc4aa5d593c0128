// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The rig bundle and its on-disk layout.
//!
//! A bundle directory holds:
//!
//! - `texture.png` - RGBA texture the skeleton coordinates refer to
//! - `mask.png` - single-channel foreground mask (0/255)
//! - `char_cfg.yaml` - `width`, `height` and the `skeleton` joint list
//! - `thumbnail.png` - square RGBA preview
//! - `bounding_box.yaml` - detection crop, only for auto-rigged bundles; saving a
//!   bundle without a crop removes a leftover one
//!
//! A bundle is written as a unit: every file is staged under a temporary name
//! first, and nothing is left behind when any write fails.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::detection::PixelRect;
use crate::error::{Result, RigError};
use crate::mask::Mask;
use crate::skeleton::{Joint, Skeleton};
use crate::utils::encode_png;

/// Texture file name.
pub const TEXTURE_FILE: &str = "texture.png";
/// Mask file name.
pub const MASK_FILE: &str = "mask.png";
/// Character config file name.
pub const CHAR_CFG_FILE: &str = "char_cfg.yaml";
/// Thumbnail file name.
pub const THUMBNAIL_FILE: &str = "thumbnail.png";
/// Bounding box file name.
pub const BOUNDING_BOX_FILE: &str = "bounding_box.yaml";

/// Which rigging path produced a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigPath {
    /// Detection, pose estimation and segmentation on a crop.
    Auto,
    /// Threshold mask and proportional skeleton on the full image.
    Simple,
}

impl fmt::Display for RigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Simple => write!(f, "simple"),
        }
    }
}

/// Contents of `char_cfg.yaml`.
///
/// Fields are declared in the order the renderer's reference files list them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub height: u32,
    pub skeleton: Vec<Joint>,
    pub width: u32,
}

impl CharacterConfig {
    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::SerializationError`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::SerializationError`] for malformed YAML or missing fields.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Convert into a skeleton, checking the tree invariant.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::ConfigError`] if the joint list is not a single tree.
    pub fn into_skeleton(self) -> Result<Skeleton> {
        let skeleton = Skeleton {
            width: self.width,
            height: self.height,
            joints: self.skeleton,
        };
        skeleton.validate()?;
        Ok(skeleton)
    }
}

impl From<&Skeleton> for CharacterConfig {
    fn from(skeleton: &Skeleton) -> Self {
        Self {
            height: skeleton.height,
            skeleton: skeleton.joints.clone(),
            width: skeleton.width,
        }
    }
}

/// The complete output of one rig construction.
///
/// Texture, mask and skeleton share one coordinate space: the full image on the
/// simple path, the detection crop on the auto path.
#[derive(Debug, Clone, PartialEq)]
pub struct RigBundle {
    /// RGBA texture.
    pub texture: RgbaImage,
    /// Foreground mask, same size as the texture.
    pub mask: Mask,
    /// Joint hierarchy in texture coordinates.
    pub skeleton: Skeleton,
    /// Square RGBA preview of the texture.
    pub thumbnail: RgbaImage,
    /// Detection crop in the (possibly downscaled) detection image, auto path only.
    pub bounding_box: Option<PixelRect>,
    /// Path that produced this bundle. Not persisted.
    pub path: RigPath,
}

impl RigBundle {
    /// Encode every bundle file in memory, in write order.
    ///
    /// # Errors
    ///
    /// Returns an error if an image or YAML document cannot be encoded.
    pub fn encode(&self) -> Result<Vec<(&'static str, Vec<u8>)>> {
        let mut files = vec![
            (
                TEXTURE_FILE,
                encode_png(&DynamicImage::ImageRgba8(self.texture.clone()))?,
            ),
            (
                MASK_FILE,
                encode_png(&DynamicImage::ImageLuma8(self.mask.as_image().clone()))?,
            ),
            (
                CHAR_CFG_FILE,
                CharacterConfig::from(&self.skeleton).to_yaml()?.into_bytes(),
            ),
            (
                THUMBNAIL_FILE,
                encode_png(&DynamicImage::ImageRgba8(self.thumbnail.clone()))?,
            ),
        ];
        if let Some(rect) = &self.bounding_box {
            files.push((BOUNDING_BOX_FILE, serde_yaml::to_string(rect)?.into_bytes()));
        }
        Ok(files)
    }

    /// Write the bundle into `dir`, creating it if needed.
    ///
    /// Files are staged as `<name>.part` and renamed into place once all of them
    /// are written. On failure, staged files and files already renamed by this
    /// call are removed.
    ///
    /// # Returns
    ///
    /// * Paths of the written files.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the directory cannot be written.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let files = self.encode()?;

        fs::create_dir_all(dir).map_err(|e| {
            RigError::IoError(format!("Failed to create {}: {e}", dir.display()))
        })?;

        let staged: Vec<(PathBuf, PathBuf)> = files
            .iter()
            .map(|(name, _)| (dir.join(format!("{name}.part")), dir.join(name)))
            .collect();

        for ((part, _), (_, bytes)) in staged.iter().zip(&files) {
            if let Err(e) = fs::write(part, bytes) {
                remove_all(staged.iter().map(|(p, _)| p));
                return Err(RigError::IoError(format!(
                    "Failed to write {}: {e}",
                    part.display()
                )));
            }
        }

        for (i, (part, dest)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(part, dest) {
                remove_all(staged[..i].iter().map(|(_, d)| d));
                remove_all(staged[i..].iter().map(|(p, _)| p));
                return Err(RigError::IoError(format!(
                    "Failed to move {} into place: {e}",
                    dest.display()
                )));
            }
        }

        if self.bounding_box.is_none() {
            let stale = dir.join(BOUNDING_BOX_FILE);
            match fs::remove_file(&stale) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(RigError::IoError(format!(
                        "Failed to remove {}: {e}",
                        stale.display()
                    )));
                }
            }
        }

        Ok(staged.into_iter().map(|(_, dest)| dest).collect())
    }
}

fn remove_all<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

/// Read the skeleton of a saved bundle from its `char_cfg.yaml`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or is not a valid tree.
pub fn load_skeleton(dir: impl AsRef<Path>) -> Result<Skeleton> {
    let path = dir.as_ref().join(CHAR_CFG_FILE);
    let text = fs::read_to_string(&path)
        .map_err(|e| RigError::IoError(format!("Failed to read {}: {e}", path.display())))?;
    CharacterConfig::from_yaml(&text)?.into_skeleton()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgba};

    fn bundle(bounding_box: Option<PixelRect>) -> RigBundle {
        let texture = RgbaImage::from_pixel(40, 60, Rgba([10, 20, 30, 255]));
        RigBundle {
            mask: Mask::from_binary(GrayImage::from_fn(40, 60, |x, _| {
                image::Luma([u8::from(x > 20)])
            })),
            skeleton: Skeleton::from_dimensions(40, 60),
            thumbnail: RgbaImage::new(16, 16),
            texture,
            bounding_box,
            path: RigPath::Simple,
        }
    }

    #[test]
    fn test_char_cfg_layout() {
        let yaml = CharacterConfig::from(&Skeleton::from_dimensions(400, 600))
            .to_yaml()
            .unwrap();

        assert!(yaml.starts_with("height: 600\nskeleton:\n"));
        assert!(yaml.ends_with("width: 400\n"));
        assert!(yaml.contains("- loc:\n  - 200\n  - 330\n  name: root\n  parent: null\n"));
        assert!(yaml.contains("  name: hip\n  parent: root\n"));
    }

    #[test]
    fn test_char_cfg_roundtrip_validates() {
        let skeleton = Skeleton::from_dimensions(300, 500);
        let yaml = CharacterConfig::from(&skeleton).to_yaml().unwrap();
        let parsed = CharacterConfig::from_yaml(&yaml).unwrap().into_skeleton().unwrap();
        assert_eq!(parsed, skeleton);
    }

    #[test]
    fn test_char_cfg_rejects_broken_tree() {
        let yaml = "height: 10\nwidth: 10\nskeleton:\n- loc: [1, 1]\n  name: a\n  parent: b\n";
        let err = CharacterConfig::from_yaml(yaml).unwrap().into_skeleton().unwrap_err();
        assert!(matches!(err, RigError::ConfigError(_)));

        assert!(matches!(
            CharacterConfig::from_yaml("height: [").unwrap_err(),
            RigError::SerializationError(_)
        ));
    }

    #[test]
    fn test_save_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("char");
        let written = bundle(None).save(&out).unwrap();

        assert_eq!(written.len(), 4);
        for name in [TEXTURE_FILE, MASK_FILE, CHAR_CFG_FILE, THUMBNAIL_FILE] {
            assert!(out.join(name).is_file(), "missing {name}");
        }
        assert!(!out.join(BOUNDING_BOX_FILE).exists());
        assert!(fs::read_dir(&out).unwrap().all(|e| {
            !e.unwrap().file_name().to_string_lossy().ends_with(".part")
        }));

        let mask = image::open(out.join(MASK_FILE)).unwrap();
        assert_eq!(mask.color(), image::ColorType::L8);
        assert!(mask.to_luma8().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));

        let texture = image::open(out.join(TEXTURE_FILE)).unwrap();
        assert_eq!(texture.color(), image::ColorType::Rgba8);
        assert_eq!(load_skeleton(&out).unwrap(), Skeleton::from_dimensions(40, 60));
    }

    #[test]
    fn test_save_bounding_box() {
        let dir = tempfile::tempdir().unwrap();
        let rect = PixelRect {
            left: 10,
            top: 10,
            right: 290,
            bottom: 390,
        };
        bundle(Some(rect)).save(dir.path()).unwrap();

        let text = fs::read_to_string(dir.path().join(BOUNDING_BOX_FILE)).unwrap();
        assert_eq!(text, "left: 10\ntop: 10\nright: 290\nbottom: 390\n");
    }

    #[test]
    fn test_simple_save_removes_old_bounding_box() {
        let dir = tempfile::tempdir().unwrap();
        let rect = PixelRect {
            left: 5,
            top: 5,
            right: 35,
            bottom: 55,
        };
        let mut auto = bundle(Some(rect));
        auto.path = RigPath::Auto;
        auto.save(dir.path()).unwrap();
        assert!(dir.path().join(BOUNDING_BOX_FILE).is_file());

        let written = bundle(None).save(dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(!dir.path().join(BOUNDING_BOX_FILE).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[test]
    fn test_save_is_byte_identical() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let bundle = bundle(None);
        bundle.save(a.path()).unwrap();
        bundle.save(b.path()).unwrap();

        for name in [TEXTURE_FILE, MASK_FILE, CHAR_CFG_FILE, THUMBNAIL_FILE] {
            assert_eq!(
                fs::read(a.path().join(name)).unwrap(),
                fs::read(b.path().join(name)).unwrap()
            );
        }
    }

    #[test]
    fn test_save_into_file_path_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        assert!(bundle(None).save(&blocker).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_rig_path_display() {
        assert_eq!(RigPath::Auto.to_string(), "auto");
        assert_eq!(RigPath::Simple.to_string(), "simple");
    }
}
