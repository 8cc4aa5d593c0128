// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Rig construction configuration.
//!
//! This module defines the [`RigConfig`] struct, which controls where the detection/pose
//! service lives, whether the auto-rig path is attempted at all, the timeouts bounding
//! every network call, and the size of the produced thumbnail.

use std::time::Duration;

use crate::error::{Result, RigError};

/// Default base URL of the detection/pose service.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";

/// Environment variable overriding [`RigConfig::service_url`].
pub const ENV_SERVICE_URL: &str = "CHARACTER_RIG_SERVICE_URL";

/// Environment variable opting into the auto-rig path.
pub const ENV_AUTO_RIG: &str = "CHARACTER_RIG_AUTO";

/// Configuration for rig construction.
///
/// The configuration is an explicit value handed to the
/// [`RigAssembler`](crate::RigAssembler); nothing is read from process-wide state
/// after construction.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use character_rig::RigConfig;
///
/// let config = RigConfig::new()
///     .with_auto_rig(true)
///     .with_service_url("http://127.0.0.1:8080")
///     .with_request_timeout(Duration::from_secs(10))
///     .with_thumbnail_size(128);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RigConfig {
    /// Base URL of the detection/pose service (no trailing path).
    pub service_url: String,
    /// Whether to attempt the detection + pose path before falling back.
    pub auto_rig: bool,
    /// Timeout for the liveness probe.
    pub probe_timeout: Duration,
    /// Timeout for each detection or pose request.
    pub request_timeout: Duration,
    /// Side length of the square thumbnail in pixels.
    pub thumbnail_size: u32,
    /// Longest side the image is downscaled to before it is sent for detection.
    pub max_detect_side: u32,
    /// Detections scoring below this are treated as "nothing detected".
    pub min_detection_score: f32,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            auto_rig: false,
            probe_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(30),
            thumbnail_size: 256,
            max_detect_side: 1000,
            min_detection_score: 0.0,
        }
    }
}

impl RigConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the defaults plus the process environment.
    ///
    /// Reads [`ENV_SERVICE_URL`] and [`ENV_AUTO_RIG`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from the defaults plus a variable lookup.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value of an environment variable, if set.
    #[must_use]
    pub fn from_env_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_SERVICE_URL).filter(|u| !u.trim().is_empty()) {
            config.service_url = url.trim().to_string();
        }
        if let Some(flag) = lookup(ENV_AUTO_RIG) {
            config.auto_rig = parse_flag(&flag);
        }
        config
    }

    /// Set the base URL of the detection/pose service.
    #[must_use]
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    /// Enable or disable the auto-rig path.
    #[must_use]
    pub const fn with_auto_rig(mut self, auto_rig: bool) -> Self {
        self.auto_rig = auto_rig;
        self
    }

    /// Set the liveness probe timeout.
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the detection/pose request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the thumbnail side length.
    #[must_use]
    pub const fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size;
        self
    }

    /// Set the longest side used for detection requests.
    #[must_use]
    pub const fn with_max_detect_side(mut self, side: u32) -> Self {
        self.max_detect_side = side;
        self
    }

    /// Set the minimum detection score accepted by the auto-rig path.
    #[must_use]
    pub const fn with_min_detection_score(mut self, score: f32) -> Self {
        self.min_detection_score = score;
        self
    }

    /// Check the configuration for values that cannot produce a rig.
    ///
    /// # Errors
    ///
    /// Returns [`RigError::ConfigError`] for an empty service URL, a zero timeout,
    /// a zero thumbnail size or a zero detection side.
    pub fn validate(&self) -> Result<()> {
        if self.service_url.trim().is_empty() {
            return Err(RigError::ConfigError("service_url is empty".to_string()));
        }
        if self.probe_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(RigError::ConfigError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.thumbnail_size == 0 {
            return Err(RigError::ConfigError(
                "thumbnail_size must be greater than zero".to_string(),
            ));
        }
        if self.max_detect_side == 0 {
            return Err(RigError::ConfigError(
                "max_detect_side must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
