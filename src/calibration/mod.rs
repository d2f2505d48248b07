//! Sensor/display calibration: sandbox detection, base plane, board targets
//! and the session driving them.
pub mod artifact;
pub mod base_plane;
pub mod board;
pub mod options;
pub mod roi;
pub mod session;
pub mod targets;

pub use artifact::CalibrationArtifact;
pub use base_plane::{fit_surface_plane, max_offset_from_plane, sample_world_points, BasePlane};
pub use board::{BoardLayout, BoardPattern, CornerDetector};
pub use options::CalibrationOptions;
pub use roi::{detect_sandbox_roi, roi_from_calibration, RoiDetectionOptions};
pub use session::{
    CalibrationCommand, CalibrationFailure, CalibrationMode, CalibrationOutcome,
    CalibrationSession, CalibrationState, DisplayRequest, Observation,
};
pub use targets::{TargetLevel, TargetSchedule};
