use super::board::BoardLayout;
use super::roi::RoiDetectionOptions;
use serde::{Deserialize, Serialize};

/// Tuning of the calibration session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOptions {
    pub board: BoardLayout,
    /// Failed attempts at one target before it is moved inward.
    pub max_trials: usize,
    /// Offset scale applied to a target whose board was never detected.
    pub shrink_not_found: f64,
    /// Offset scale applied to a target whose corners lacked depth.
    pub shrink_no_depth: f64,
    /// ROI scale used when fitting the base and board planes.
    pub plane_roi_scale: f64,
    /// Margin kept between the board plane and the filter's valid floor.
    pub safe_range: f64,
    pub roi_detection: RoiDetectionOptions,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            board: BoardLayout::default(),
            max_trials: 10,
            shrink_not_found: 0.75,
            shrink_no_depth: 0.8,
            plane_roi_scale: 0.75,
            safe_range: 50.0,
            roi_detection: RoiDetectionOptions::default(),
        }
    }
}

impl CalibrationOptions {
    pub fn with_board(mut self, board: BoardLayout) -> Self {
        self.board = board;
        self
    }

    pub fn with_max_trials(mut self, trials: usize) -> Self {
        self.max_trials = trials;
        self
    }

    pub fn with_safe_range(mut self, range: f64) -> Self {
        self.safe_range = range;
        self
    }
}
