// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Rig construction with graceful fallback.
//!
//! One call runs:
//!
//! ```text
//! load ─► probe ─► auto rig ──────────────┐
//!           │        │ any step fails     ├─► thumbnail ─► bundle
//!           │        ▼                    │
//!           └─────► simple rig ───────────┘
//! ```
//!
//! The auto rig is attempted only when enabled in the configuration and the
//! service answers its probe. It detects the character, crops to the box,
//! estimates the pose on the crop and segments the crop. The simple rig is a pure
//! function of the image and cannot fail, so every decodable image yields a
//! complete bundle.

use image::buffer::ConvertBuffer;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage, imageops};

use crate::bundle::{RigBundle, RigPath};
use crate::config::RigConfig;
use crate::detection::{DetectionService, HttpDetectionClient, PixelRect};
use crate::error::Result;
use crate::mask::Mask;
use crate::skeleton::Skeleton;
use crate::source::{Source, channel_count, ensure_nonzero, to_rgba};
use crate::thumbnail::{limit_longest_side, make_thumbnail};
use crate::verbose;

/// Texture, mask and skeleton of one rigging path, before the thumbnail.
struct PartialRig {
    texture: RgbaImage,
    mask: Mask,
    skeleton: Skeleton,
    bounding_box: Option<PixelRect>,
    path: RigPath,
}

/// Builds rig bundles from source images.
///
/// Holds no per-image state; one assembler can rig any number of images.
///
/// # Example
///
/// ```no_run
/// use character_rig::{RigAssembler, RigConfig};
///
/// let assembler = RigAssembler::from_config(RigConfig::from_env())?;
/// let bundle = assembler.rig(&"character.png".into())?;
/// bundle.save("out/character")?;
/// # Ok::<(), character_rig::RigError>(())
/// ```
#[derive(Debug)]
pub struct RigAssembler<S: DetectionService> {
    config: RigConfig,
    service: S,
}

impl RigAssembler<HttpDetectionClient> {
    /// Create an assembler talking to the HTTP service named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::ConfigError`](crate::RigError::ConfigError) if the
    /// configuration is invalid.
    pub fn from_config(config: RigConfig) -> Result<Self> {
        let service = HttpDetectionClient::from_config(&config);
        Self::new(config, service)
    }
}

impl<S: DetectionService> RigAssembler<S> {
    /// Create an assembler with an explicit detection service.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::ConfigError`](crate::RigError::ConfigError) if the
    /// configuration is invalid.
    pub fn new(config: RigConfig, service: S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, service })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Detection service in use.
    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Load a source image and rig it.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::DecodeError`](crate::RigError::DecodeError) if the source
    /// cannot be decoded or has zero size. No other failure reaches the caller.
    pub fn rig(&self, source: &Source) -> Result<RigBundle> {
        let image = source.load()?;
        self.rig_image(&image)
    }

    /// Rig an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::DecodeError`](crate::RigError::DecodeError) for a
    /// zero-sized image, or an image error if the thumbnail cannot be produced.
    pub fn rig_image(&self, image: &DynamicImage) -> Result<RigBundle> {
        ensure_nonzero(image)?;
        let (width, height) = image.dimensions();
        verbose!("Input: {width}x{height}, channels={}", channel_count(image));

        let rig = match self.try_auto_rig(image) {
            Some(rig) => rig,
            None => simple_rig(image),
        };

        let thumbnail = make_thumbnail(&rig.texture, self.config.thumbnail_size)?;

        Ok(RigBundle {
            texture: rig.texture,
            mask: rig.mask,
            skeleton: rig.skeleton,
            thumbnail,
            bounding_box: rig.bounding_box,
            path: rig.path,
        })
    }

    fn try_auto_rig(&self, image: &DynamicImage) -> Option<PartialRig> {
        if !self.config.auto_rig {
            return None;
        }
        if !self.service.is_service_available() {
            verbose!("Detection service unreachable, using simple rig");
            return None;
        }

        let working = match limit_longest_side(&to_rgba(image), self.config.max_detect_side) {
            Ok(working) => working,
            Err(e) => {
                verbose!("Could not scale image for detection: {e}");
                return None;
            }
        };
        let (width, height) = working.dimensions();

        let Some(detection) = self.service.detect(&opaque(&working)) else {
            verbose!("No character detected, using simple rig");
            return None;
        };
        if detection.score < self.config.min_detection_score {
            verbose!(
                "Detection score {:.3} below {:.3}, using simple rig",
                detection.score,
                self.config.min_detection_score
            );
            return None;
        }
        let Some(rect) = detection.bounding_box.to_pixel_rect(width, height) else {
            verbose!("Detection box is malformed or empty inside the image, using simple rig");
            return None;
        };

        let cropped =
            imageops::crop_imm(&working, rect.left, rect.top, rect.width(), rect.height())
                .to_image();

        let Some(pose) = self.service.estimate_pose(&opaque(&cropped)) else {
            verbose!("No pose found, using simple rig");
            return None;
        };

        let (crop_w, crop_h) = cropped.dimensions();
        let cropped = DynamicImage::ImageRgba8(cropped);
        let mask = Mask::segment(&cropped);
        let skeleton = Skeleton::from_pose(&pose, crop_w, crop_h);
        verbose!("Auto-rigged: {crop_w}x{crop_h}, {} joints", skeleton.len());

        Some(PartialRig {
            texture: cropped.into_rgba8(),
            mask,
            skeleton,
            bounding_box: Some(rect),
            path: RigPath::Auto,
        })
    }
}

/// Drop the alpha channel of an image before sending it to the service.
fn opaque(image: &RgbaImage) -> DynamicImage {
    let rgb: RgbImage = image.convert();
    DynamicImage::ImageRgb8(rgb)
}

/// Threshold mask and proportional skeleton over the full image.
fn simple_rig(image: &DynamicImage) -> PartialRig {
    let (width, height) = image.dimensions();
    let skeleton = Skeleton::from_dimensions(width, height);
    verbose!("Simple skeleton: {width}x{height}, {} joints", skeleton.len());

    PartialRig {
        texture: to_rgba(image),
        mask: Mask::from_image(image),
        skeleton,
        bounding_box: None,
        path: RigPath::Simple,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RigError;
    use crate::detection::{BoundingBox, DetectionResult, ScriptedService};
    use crate::keypoints::{Keypoint, NUM_KEYPOINTS, PoseResult};
    use image::{Rgb, RgbImage};

    fn pose() -> PoseResult {
        #[allow(clippy::cast_precision_loss)]
        let kpts: Vec<Keypoint> = (0..NUM_KEYPOINTS)
            .map(|i| Keypoint::new(20.0 + i as f32 * 5.0, 30.0 + i as f32 * 10.0, 0.9))
            .collect();
        PoseResult::from_slice(&kpts).unwrap()
    }

    fn detection(l: f32, t: f32, r: f32, b: f32, score: f32) -> DetectionResult {
        DetectionResult::new(BoundingBox::new(l, t, r, b), score)
    }

    fn scripted(detection: DetectionResult) -> ScriptedService {
        ScriptedService::available(Some(detection), Some(pose()))
    }

    fn auto_config() -> RigConfig {
        RigConfig::new().with_auto_rig(true).with_thumbnail_size(32)
    }

    fn image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([240, 240, 240])))
    }

    #[test]
    fn test_auto_rig_disabled_never_probes() {
        let service = scripted(detection(0.0, 0.0, 10.0, 10.0, 1.0));
        let assembler = RigAssembler::new(RigConfig::new(), &service).unwrap();
        let bundle = assembler.rig_image(&image(50, 80)).unwrap();

        assert_eq!(bundle.path, RigPath::Simple);
        assert_eq!(service.probe_calls(), 0);
        assert_eq!(service.detect_calls(), 0);
    }

    #[test]
    fn test_unavailable_service_falls_back() {
        let service = ScriptedService::unavailable();
        let assembler = RigAssembler::new(auto_config(), &service).unwrap();
        let bundle = assembler.rig_image(&image(50, 80)).unwrap();

        assert_eq!(bundle.path, RigPath::Simple);
        assert_eq!(bundle.texture.dimensions(), (50, 80));
        assert_eq!(bundle.mask.dimensions(), (50, 80));
        assert_eq!(bundle.thumbnail.dimensions(), (32, 32));
        assert!(bundle.bounding_box.is_none());
        assert_eq!((service.probe_calls(), service.detect_calls()), (1, 0));
    }

    #[test]
    fn test_missing_detection_skips_pose() {
        let service = ScriptedService::available(None, Some(pose()));
        let assembler = RigAssembler::new(auto_config(), &service).unwrap();
        let bundle = assembler.rig_image(&image(60, 60)).unwrap();

        assert_eq!(bundle.path, RigPath::Simple);
        assert_eq!((service.detect_calls(), service.pose_calls()), (1, 0));
    }

    #[test]
    fn test_missing_pose_falls_back() {
        let service = ScriptedService::available(Some(detection(5.0, 5.0, 40.0, 50.0, 0.9)), None);
        let assembler = RigAssembler::new(auto_config(), &service).unwrap();
        let bundle = assembler.rig_image(&image(60, 60)).unwrap();

        assert_eq!(bundle.path, RigPath::Simple);
        assert_eq!(bundle.skeleton, Skeleton::from_dimensions(60, 60));
        assert_eq!((service.detect_calls(), service.pose_calls()), (1, 1));
    }

    #[test]
    fn test_low_score_and_empty_box_fall_back() {
        let service = scripted(detection(5.0, 5.0, 40.0, 50.0, 0.2));
        let config = auto_config().with_min_detection_score(0.5);
        let assembler = RigAssembler::new(config, &service).unwrap();
        let bundle = assembler.rig_image(&image(60, 60)).unwrap();
        assert_eq!(bundle.path, RigPath::Simple);
        assert_eq!(service.pose_calls(), 0);

        let service = scripted(detection(70.0, 70.0, 90.0, 90.0, 1.0));
        let assembler = RigAssembler::new(auto_config(), &service).unwrap();
        let bundle = assembler.rig_image(&image(60, 60)).unwrap();
        assert_eq!(bundle.path, RigPath::Simple);
        assert_eq!(service.pose_calls(), 0);

        let service = scripted(detection(f32::NAN, 5.0, 40.0, 50.0, 1.0));
        let assembler = RigAssembler::new(auto_config(), &service).unwrap();
        let bundle = assembler.rig_image(&image(60, 60)).unwrap();
        assert_eq!(bundle.path, RigPath::Simple);
        assert!(bundle.bounding_box.is_none());
        assert_eq!(service.pose_calls(), 0);
    }

    #[test]
    fn test_auto_rig_crops_to_box() {
        let service = scripted(detection(10.0, 20.0, 110.0, 170.0, 0.9));
        let assembler = RigAssembler::new(auto_config(), &service).unwrap();
        let bundle = assembler.rig_image(&image(200, 200)).unwrap();

        assert_eq!(bundle.path, RigPath::Auto);
        assert_eq!(bundle.texture.dimensions(), (100, 150));
        assert_eq!(bundle.mask.dimensions(), (100, 150));
        assert_eq!((bundle.skeleton.width, bundle.skeleton.height), (100, 150));
        assert_eq!(bundle.skeleton, Skeleton::from_pose(&pose(), 100, 150));
        assert_eq!(
            bundle.bounding_box,
            Some(PixelRect {
                left: 10,
                top: 20,
                right: 110,
                bottom: 170
            })
        );
        assert_eq!(
            (service.probe_calls(), service.detect_calls(), service.pose_calls()),
            (1, 1, 1)
        );
    }

    #[test]
    fn test_auto_rig_downscales_large_images() {
        let service = scripted(detection(0.0, 0.0, 50.0, 25.0, 0.9));
        let config = auto_config().with_max_detect_side(100);
        let assembler = RigAssembler::new(config, &service).unwrap();
        let bundle = assembler.rig_image(&image(400, 200)).unwrap();

        assert_eq!(bundle.path, RigPath::Auto);
        assert_eq!(bundle.texture.dimensions(), (50, 25));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RigConfig::new().with_thumbnail_size(0);
        let err = RigAssembler::new(config, ScriptedService::unavailable()).unwrap_err();
        assert!(matches!(err, RigError::ConfigError(_)));
    }

    #[test]
    fn test_zero_sized_image_is_decode_error() {
        let assembler = RigAssembler::new(RigConfig::new(), ScriptedService::unavailable());
        let err = assembler.unwrap().rig_image(&DynamicImage::new_rgb8(0, 0)).unwrap_err();
        assert!(matches!(err, RigError::DecodeError(_)));
    }
}
