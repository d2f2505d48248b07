use serde::{Deserialize, Serialize};

/// Options of the coarse gradient field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientOptions {
    /// Cell edge length R in sensor pixels (>= 2).
    pub resolution: usize,
    /// Upper bound on the length of a cell vector.
    pub max_magnitude: f32,
}

impl Default for GradientOptions {
    fn default() -> Self {
        Self {
            resolution: 10,
            max_magnitude: 1000.0,
        }
    }
}

impl GradientOptions {
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution.max(2);
        self
    }

    pub fn with_max_magnitude(mut self, max_magnitude: f32) -> Self {
        self.max_magnitude = max_magnitude;
        self
    }
}
