//! Pinhole-camera distance estimation.
//!
//! `distance = known_object_width * focal_length / pixel_width`. Both
//! constants are calibrated externally and fixed at construction; there is
//! no runtime calibration.

/// Sentinel distance returned for degenerate input. The orchestrator treats
/// it as "far enough to ignore".
pub const FAR_SENTINEL_M: f64 = 999.0;

#[derive(Clone, Copy, Debug)]
pub struct DistanceEstimator {
    focal_length: f64,
    known_width: f64,
}

impl DistanceEstimator {
    pub fn new(focal_length: f64, known_width: f64) -> Self {
        Self {
            focal_length,
            known_width,
        }
    }

    /// Estimate distance in meters from an observed bounding-box width in
    /// pixels. Non-positive or non-finite input, or a non-finite result,
    /// yields [`FAR_SENTINEL_M`]. Never errors.
    pub fn estimate_from_pixel_width(&self, pixel_width: f64) -> f64 {
        if !pixel_width.is_finite() || pixel_width <= 0.0 {
            return FAR_SENTINEL_M;
        }
        let distance = (self.known_width * self.focal_length) / pixel_width;
        if distance.is_finite() {
            distance
        } else {
            FAR_SENTINEL_M
        }
    }
}
