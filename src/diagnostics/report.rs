use super::timing::TimingBreakdown;
use crate::types::Roi;
use serde::{Deserialize, Serialize};

/// Summary of one producer cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Monotonic cycle counter of the pipeline (dropped frames included).
    pub cycle: u64,
    /// False when the raw frame was dropped.
    pub processed: bool,
    pub roi: Roi,
    pub stable_pixels: usize,
    pub big_changes: usize,
    pub accepted_samples: usize,
    pub stabilized: bool,
    pub timings: TimingBreakdown,
}

impl CycleReport {
    /// Share of ROI pixels that passed the stability test.
    pub fn stable_fraction(&self) -> f32 {
        let area = self.roi.width() * self.roi.height();
        if area == 0 {
            0.0
        } else {
            self.stable_pixels as f32 / area as f32
        }
    }
}
