// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Blocking HTTP client for the detection/pose service.

use std::time::Duration;

use image::DynamicImage;
use serde::Deserialize;

use super::{BoundingBox, DetectionResult, DetectionService};
use crate::config::RigConfig;
use crate::keypoints::{Keypoint, PoseResult};
use crate::utils::encode_png;
use crate::verbose;

/// Liveness probe path.
pub const PING_PATH: &str = "/ping";

/// Character detection endpoint.
pub const DETECTOR_PATH: &str = "/predictions/drawn_humanoid_detector";

/// Pose estimation endpoint.
pub const POSE_PATH: &str = "/predictions/drawn_humanoid_pose_estimator";

/// HTTP-backed [`DetectionService`].
///
/// The probe and the prediction requests use separate agents so each call is
/// bounded by its own global timeout. No state is kept between calls.
pub struct HttpDetectionClient {
    base_url: String,
    probe_agent: ureq::Agent,
    request_agent: ureq::Agent,
}

impl std::fmt::Debug for HttpDetectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDetectionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpDetectionClient {
    /// Create a client for the service at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. `http://localhost:8080`.
    /// * `probe_timeout` - Upper bound for the liveness probe.
    /// * `request_timeout` - Upper bound for each detection or pose request.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        probe_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            probe_agent: agent_with_timeout(probe_timeout),
            request_agent: agent_with_timeout(request_timeout),
        }
    }

    /// Create a client from the service URL and timeouts of a configuration.
    #[must_use]
    pub fn from_config(config: &RigConfig) -> Self {
        Self::new(
            config.service_url.clone(),
            config.probe_timeout,
            config.request_timeout,
        )
    }

    /// Service root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST an image as PNG and return the response body of a 2xx answer.
    fn post_png(&self, path: &str, image: &DynamicImage) -> Option<Vec<u8>> {
        let body = match encode_png(image) {
            Ok(body) => body,
            Err(e) => {
                verbose!("Could not encode image for {path}: {e}");
                return None;
            }
        };

        let url = self.url(path);
        let response = match self
            .request_agent
            .post(&url)
            .header("Content-Type", "image/png")
            .send(body.as_slice())
        {
            Ok(response) => response,
            Err(e) => {
                verbose!("Request to {url} failed: {}", describe(&e));
                return None;
            }
        };

        if !response.status().is_success() {
            verbose!("Request to {url} returned status {}", response.status());
            return None;
        }

        match response.into_body().read_to_vec() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                verbose!("Failed to read response from {url}: {}", describe(&e));
                None
            }
        }
    }
}

impl DetectionService for HttpDetectionClient {
    fn is_service_available(&self) -> bool {
        let url = self.url(PING_PATH);
        match self.probe_agent.get(&url).call() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                verbose!("Service probe {url} failed: {}", describe(&e));
                false
            }
        }
    }

    fn detect(&self, image: &DynamicImage) -> Option<DetectionResult> {
        let body = self.post_png(DETECTOR_PATH, image)?;
        parse_detections(&body)
    }

    fn estimate_pose(&self, image: &DynamicImage) -> Option<PoseResult> {
        let body = self.post_png(POSE_PATH, image)?;
        parse_pose(&body)
    }
}

fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    ureq::Agent::new_with_config(config)
}

fn describe(err: &ureq::Error) -> String {
    match err {
        ureq::Error::Timeout(_) => "timed out".to_string(),
        ureq::Error::Io(io_err) => format!("network error: {io_err}"),
        ureq::Error::StatusCode(code) => format!("status {code}"),
        _ => err.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    score: f32,
    bbox: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct RawPose {
    keypoints: Vec<Vec<f32>>,
}

/// Parse a detection response: a JSON array of `{score, bbox: [l, t, r, b]}`.
///
/// # Returns
///
/// * The best scoring candidate, or `None` for malformed JSON or an empty array.
///   Candidates whose box has fewer than four values are skipped.
#[must_use]
pub fn parse_detections(body: &[u8]) -> Option<DetectionResult> {
    let raw: Vec<RawDetection> = match serde_json::from_slice(body) {
        Ok(raw) => raw,
        Err(e) => {
            verbose!("Malformed detection response: {e}");
            return None;
        }
    };

    let candidates = raw.into_iter().filter_map(|d| match d.bbox.as_slice() {
        [l, t, r, b, ..] => Some(DetectionResult::new(BoundingBox::new(*l, *t, *r, *b), d.score)),
        _ => None,
    });
    DetectionResult::best(candidates)
}

/// Parse a pose response: a JSON array of `{keypoints: [[x, y, confidence], ...]}`.
///
/// Only the first candidate is used. Confidence defaults to 0 when omitted.
///
/// # Returns
///
/// * `None` for malformed JSON, an empty array, fewer than 17 keypoints or a
///   keypoint with fewer than two coordinates.
#[must_use]
pub fn parse_pose(body: &[u8]) -> Option<PoseResult> {
    let raw: Vec<RawPose> = match serde_json::from_slice(body) {
        Ok(raw) => raw,
        Err(e) => {
            verbose!("Malformed pose response: {e}");
            return None;
        }
    };

    let first = raw.into_iter().next()?;
    let keypoints = first
        .keypoints
        .iter()
        .map(|k| match k.as_slice() {
            [x, y, rest @ ..] => Some(Keypoint::new(*x, *y, rest.first().copied().unwrap_or(0.0))),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    PoseResult::from_slice(&keypoints)
}
