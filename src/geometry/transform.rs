//! Conversions between sensor pixels, world space and display pixels.
//!
//! The engine holds the sensor model, the base plane used for elevation and
//! the optional world → display calibration. Every method is a pure function
//! of those three values.
use super::plane::PlaneEquation;
use super::projective::ProjectiveCalibration;
use super::sensor::SensorModel;
use crate::image::ImageF32;
use nalgebra::{Vector2, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransform {
    sensor: SensorModel,
    plane: PlaneEquation,
    calibration: Option<ProjectiveCalibration>,
}

impl CoordinateTransform {
    pub fn new(sensor: SensorModel, plane: PlaneEquation) -> Self {
        Self {
            sensor,
            plane,
            calibration: None,
        }
    }

    pub fn with_calibration(mut self, calibration: ProjectiveCalibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn set_calibration(&mut self, calibration: Option<ProjectiveCalibration>) {
        self.calibration = calibration;
    }

    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    pub fn plane(&self) -> &PlaneEquation {
        &self.plane
    }

    pub fn calibration(&self) -> Option<&ProjectiveCalibration> {
        self.calibration.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    #[inline]
    pub fn sensor_to_world(&self, x: f64, y: f64, depth: f64) -> Vector3<f64> {
        self.sensor.to_world(x, y, depth)
    }

    #[inline]
    pub fn world_to_sensor(&self, world: &Vector3<f64>) -> Option<Vector2<f64>> {
        self.sensor.to_sensor(world)
    }

    /// Apply the calibration and divide by the homogeneous coordinate.
    pub fn world_to_display(&self, world: &Vector3<f64>) -> Option<Vector2<f64>> {
        self.calibration?.project(world)
    }

    pub fn sensor_to_display(&self, x: f64, y: f64, depth: f64) -> Option<Vector2<f64>> {
        self.world_to_display(&self.sensor_to_world(x, y, depth))
    }

    /// World point at height `world_z` seen at display pixel `(u, v)`.
    ///
    /// `None` when uncalibrated or when the 2×2 system is singular; callers
    /// must not substitute the origin.
    pub fn display_to_world(&self, u: f64, v: f64, world_z: f64) -> Option<Vector3<f64>> {
        let m = self.calibration?.matrix();
        let denom = m[(2, 2)] * world_z + m[(2, 3)];
        let a = m[(0, 0)] - m[(2, 0)] * u;
        let b = m[(0, 1)] - m[(2, 1)] * u;
        let c = denom * u - (m[(0, 2)] * world_z + m[(0, 3)]);
        let d = m[(1, 0)] - m[(2, 0)] * v;
        let e = m[(1, 1)] - m[(2, 1)] * v;
        let f = denom * v - (m[(1, 2)] * world_z + m[(1, 3)]);

        let det = a * e - b * d;
        if det == 0.0 {
            return None;
        }
        let x = (c * e - b * f) / det;
        let y = (a * f - d * c) / det;
        (x.is_finite() && y.is_finite()).then(|| Vector3::new(x, y, world_z))
    }

    /// Sensor pixel under display pixel `(u, v)` at height `world_z`.
    pub fn display_to_sensor(&self, u: f64, v: f64, world_z: f64) -> Option<Vector2<f64>> {
        self.world_to_sensor(&self.display_to_world(u, v, world_z)?)
    }

    /// Signed height above the base plane (positive above).
    #[inline]
    pub fn elevation(&self, world: &Vector3<f64>) -> f64 {
        self.plane.elevation(world)
    }

    /// Raw depth that would put sensor pixel `(x, y)` at `elevation`.
    ///
    /// `depth` is the current depth at the pixel and fixes the lateral world
    /// position. `None` for a plane parallel to the depth axis.
    pub fn depth_for_elevation(&self, x: f64, y: f64, depth: f64, elevation: f64) -> Option<f64> {
        let n = &self.plane.normal;
        if n.z == 0.0 {
            return None;
        }
        let mut world = self.sensor_to_world(x, y, depth);
        world.z = 0.0;
        Some(-(n.dot(&world) + self.plane.offset + elevation) / n.z)
    }

    /// Elevation of sensor pixel `(x, y)` in a filtered frame.
    ///
    /// `None` outside the frame or where the frame holds no depth.
    pub fn elevation_at(&self, frame: &ImageF32, x: f64, y: f64) -> Option<f64> {
        let depth = frame.sample(x, y)?;
        (depth > 0.0).then(|| self.elevation(&self.sensor_to_world(x, y, depth as f64)))
    }
}
