use serde::{Deserialize, Serialize};

/// Options of the per-pixel temporal stability filter.
///
/// Depth values are in raw sensor units (millimetres for the usual sensors).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalOptions {
    /// Depth K of the averaging ring (>= 1).
    pub averaging_slots: usize,
    /// Maximum sample variance for a pixel to count as stable.
    pub max_variance: f32,
    /// Minimum change of the running mean before the visible value moves.
    pub hysteresis: f32,
    /// Reset a pixel's history when a sample jumps away from its mean.
    pub follow_big_change: bool,
    /// Jump size (depth units) that triggers the reset above.
    pub big_change: f32,
    /// Samples at or below this value are treated as outside the sensed
    /// surface (occluded, too close to the sensor).
    pub valid_floor: f32,
    /// Seed of the valid buffer after a reset.
    pub initial_value: f32,
    /// Cycles after a reset before the surface is reported as stabilized.
    pub min_init_frames: usize,
}

impl Default for TemporalOptions {
    fn default() -> Self {
        Self {
            averaging_slots: 15,
            max_variance: 4.0,
            hysteresis: 0.5,
            follow_big_change: false,
            big_change: 10.0,
            valid_floor: 570.0,
            initial_value: 4000.0,
            min_init_frames: 60,
        }
    }
}

impl TemporalOptions {
    /// Minimum number of samples for a stability decision, `⌈(K+1)/2⌉`.
    #[inline]
    pub fn min_samples(&self) -> u32 {
        (self.averaging_slots as u32 + 2) / 2
    }

    pub fn with_averaging_slots(mut self, slots: usize) -> Self {
        self.averaging_slots = slots.max(1);
        self
    }

    pub fn with_max_variance(mut self, max_variance: f32) -> Self {
        self.max_variance = max_variance;
        self
    }

    pub fn with_hysteresis(mut self, hysteresis: f32) -> Self {
        self.hysteresis = hysteresis;
        self
    }

    pub fn with_big_change(mut self, follow: bool, threshold: f32) -> Self {
        self.follow_big_change = follow;
        self.big_change = threshold;
        self
    }

    pub fn with_valid_floor(mut self, floor: f32) -> Self {
        self.valid_floor = floor;
        self
    }

    pub fn with_min_init_frames(mut self, frames: usize) -> Self {
        self.min_init_frames = frames;
        self
    }
}

/// Options of the separable spatial smoothing pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingOptions {
    pub enabled: bool,
    /// Number of column+row passes.
    pub passes: usize,
}

impl Default for SmoothingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            passes: 2,
        }
    }
}
