//! Runtime configuration for scene hosts.
//!
//! Camera defaults for synthesized and scanned perspective cameras, the pixel
//! ratio ceiling, and telemetry. Configuration can be loaded from environment
//! variables or constructed programmatically.

use serde::{Deserialize, Serialize};
use std::env;

/// Default vertical field of view in degrees.
pub const DEFAULT_FOV: f64 = 75.0;
/// Default near clipping plane.
pub const DEFAULT_NEAR: f64 = 0.1;
/// Default far clipping plane.
pub const DEFAULT_FAR: f64 = 1000.0;
/// Default device pixel ratio ceiling.
pub const DEFAULT_MAX_PIXEL_RATIO: f64 = 2.0;

/// Runtime configuration shared by every host of an [`crate::Engine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Field of view for perspective cameras, in degrees
    pub fov: f64,
    /// Near clipping plane for perspective cameras
    pub near: f64,
    /// Far clipping plane for perspective cameras
    pub far: f64,
    /// Device pixel ratios above this are clamped (never below 1)
    pub max_pixel_ratio: f64,
    /// Whether to emit one JSON counters line per rendered frame
    pub telemetry_enabled: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_FOV,
            DEFAULT_NEAR,
            DEFAULT_FAR,
            DEFAULT_MAX_PIXEL_RATIO,
            false,
        )
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn env_number(name: &str) -> Option<f64> {
    env::var(name)
        .ok()
        .and_then(|val| val.trim().parse::<f64>().ok())
}

impl HostConfig {
    /// Construct a new `HostConfig` with explicit values.
    ///
    /// # Arguments
    ///
    /// * `fov` - Perspective field of view in degrees
    /// * `near` - Near clipping plane
    /// * `far` - Far clipping plane, kept beyond `near`
    /// * `max_pixel_ratio` - Pixel ratio ceiling (minimum 1)
    /// * `telemetry_enabled` - Whether to emit per-frame counters
    ///
    /// # Returns
    ///
    /// A new `HostConfig`; invalid numbers fall back to the defaults
    #[inline]
    #[must_use]
    pub fn new(
        fov: f64,
        near: f64,
        far: f64,
        max_pixel_ratio: f64,
        telemetry_enabled: bool,
    ) -> Self {
        let near = positive_or(near, DEFAULT_NEAR);
        let far = positive_or(far, DEFAULT_FAR);
        Self {
            fov: positive_or(fov, DEFAULT_FOV),
            near,
            far: if far > near { far } else { near * 10.0 },
            max_pixel_ratio: positive_or(max_pixel_ratio, DEFAULT_MAX_PIXEL_RATIO).max(1.0),
            telemetry_enabled,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `SCENE_DEFAULT_FOV`: Perspective field of view (default: 75)
    /// - `SCENE_DEFAULT_NEAR`: Near plane (default: 0.1)
    /// - `SCENE_DEFAULT_FAR`: Far plane (default: 1000)
    /// - `SCENE_MAX_PIXEL_RATIO`: Pixel ratio ceiling (default: 2, minimum 1)
    /// - `SCENE_TELEMETRY`: Set to "1" to enable telemetry (default: disabled)
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            env_number("SCENE_DEFAULT_FOV").unwrap_or(DEFAULT_FOV),
            env_number("SCENE_DEFAULT_NEAR").unwrap_or(DEFAULT_NEAR),
            env_number("SCENE_DEFAULT_FAR").unwrap_or(DEFAULT_FAR),
            env_number("SCENE_MAX_PIXEL_RATIO").unwrap_or(DEFAULT_MAX_PIXEL_RATIO),
            env::var("SCENE_TELEMETRY").ok().as_deref() == Some("1"),
        )
    }

    /// Clamp a device pixel ratio into `(0, max_pixel_ratio]`; invalid input becomes 1.
    #[inline]
    #[must_use]
    pub fn clamp_pixel_ratio(&self, ratio: f64) -> f64 {
        positive_or(ratio, 1.0).min(self.max_pixel_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_fall_back() {
        let config = HostConfig::new(f64::NAN, -1.0, 0.05, 0.5, false);
        assert!((config.fov - DEFAULT_FOV).abs() < f64::EPSILON);
        assert!((config.near - DEFAULT_NEAR).abs() < f64::EPSILON);
        assert!(config.far > config.near);
        assert!((config.max_pixel_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pixel_ratio_is_clamped() {
        let config = HostConfig::default();
        assert!((config.clamp_pixel_ratio(3.0) - 2.0).abs() < f64::EPSILON);
        assert!((config.clamp_pixel_ratio(1.5) - 1.5).abs() < f64::EPSILON);
        assert!((config.clamp_pixel_ratio(0.0) - 1.0).abs() < f64::EPSILON);
    }
}
