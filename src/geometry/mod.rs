//! Plane fitting, projective calibration and coordinate transforms.
pub mod plane;
pub mod projective;
pub mod sensor;
pub mod transform;

pub use plane::{fit_plane, PlaneEquation};
pub use projective::{
    solve_projective, Correspondence, ProjectiveCalibration, SolveError, MIN_CORRESPONDENCES,
};
pub use sensor::SensorModel;
pub use transform::CoordinateTransform;
