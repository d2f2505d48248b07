#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod calibration;
pub mod config;
pub mod error;
pub mod geometry;
pub mod image;
pub mod pipeline;
pub mod types;
pub mod worker;

// Building blocks of the per-cycle pipeline.
pub mod diagnostics;
pub mod filter;
pub mod gradient;

// --- High-level re-exports -------------------------------------------------

pub use crate::calibration::{
    CalibrationArtifact, CalibrationCommand, CalibrationMode, CalibrationOutcome,
    CalibrationSession, CalibrationState, CornerDetector, DisplayRequest, Observation,
};
pub use crate::config::SurfaceSettings;
pub use crate::error::SurfaceError;
pub use crate::geometry::{CoordinateTransform, PlaneEquation, ProjectiveCalibration, SensorModel};
pub use crate::pipeline::{SurfaceParams, SurfacePipeline};
pub use crate::types::{Resolution, Roi};
pub use crate::worker::{FilterAction, FilterControl, SurfaceWorker};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use sand_surface::prelude::*;
///
/// let res = Resolution::new(640, 480);
/// let mut pipeline = SurfacePipeline::new(res, Roi::full(res), SurfaceParams::default());
/// let frame = RawDepthFrame::filled(640, 480, 1000);
/// for _ in 0..70 {
///     pipeline.process(frame.as_view());
/// }
/// println!("stabilized={}", pipeline.is_stabilized());
/// ```
pub mod prelude {
    pub use crate::image::{ImageF32, RawDepthFrame, SensorFrame};
    pub use crate::{
        CoordinateTransform, FilterAction, FilterControl, Resolution, Roi, SurfaceParams,
        SurfacePipeline, SurfaceWorker,
    };
}
