//! Base plane ("sea level") and the surface-sampling fits used to find it.
use crate::geometry::{fit_plane, PlaneEquation, SensorModel};
use crate::image::ImageF32;
use crate::types::Roi;
use log::debug;
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Reference plane plus the operator's sea-level adjustment.
///
/// The reference normal and point come from calibration; the tilt and
/// vertical offset are applied on top and dropped by [`reset`](Self::reset).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasePlane {
    pub normal: Vector3<f64>,
    pub point: Vector3<f64>,
    /// Rotation of the normal about the world x axis, degrees.
    pub tilt_x_deg: f64,
    /// Rotation of the normal about the world y axis, degrees.
    pub tilt_y_deg: f64,
    /// Shift of the point along the depth axis, world units.
    pub vertical_offset: f64,
}

impl Default for BasePlane {
    fn default() -> Self {
        Self {
            normal: Vector3::z(),
            point: Vector3::new(0.0, 0.0, 870.0),
            tilt_x_deg: 0.0,
            tilt_y_deg: 0.0,
            vertical_offset: 0.0,
        }
    }
}

impl BasePlane {
    /// Reference taken from a fitted plane; the point is where the plane
    /// crosses the depth axis.
    pub fn from_equation(eq: &PlaneEquation) -> Option<Self> {
        if eq.normal.z == 0.0 {
            return None;
        }
        Some(Self {
            normal: eq.normal,
            point: Vector3::new(0.0, 0.0, -eq.offset / eq.normal.z),
            ..Self::default()
        })
    }

    pub fn with_tilt(mut self, tilt_x_deg: f64, tilt_y_deg: f64) -> Self {
        self.tilt_x_deg = tilt_x_deg;
        self.tilt_y_deg = tilt_y_deg;
        self
    }

    pub fn with_vertical_offset(mut self, offset: f64) -> Self {
        self.vertical_offset = offset;
        self
    }

    /// Drop the sea-level adjustment.
    pub fn reset(&mut self) {
        self.tilt_x_deg = 0.0;
        self.tilt_y_deg = 0.0;
        self.vertical_offset = 0.0;
    }

    /// Adjusted normal.
    pub fn adjusted_normal(&self) -> Vector3<f64> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.tilt_x_deg.to_radians());
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.tilt_y_deg.to_radians());
        ry * rx * self.normal
    }

    /// Adjusted point.
    pub fn adjusted_point(&self) -> Vector3<f64> {
        self.point + Vector3::new(0.0, 0.0, self.vertical_offset)
    }

    /// Equation used for elevation queries; `None` for a zero normal.
    pub fn equation(&self) -> Option<PlaneEquation> {
        PlaneEquation::from_point_normal(&self.adjusted_point(), &self.adjusted_normal())
    }

    /// Depth-axis height of the adjusted plane at the world origin.
    pub fn base_depth(&self) -> f64 {
        self.adjusted_point().z
    }
}

/// World points of every pixel with depth inside `roi`.
pub fn sample_world_points(frame: &ImageF32, roi: &Roi, sensor: &SensorModel) -> Vec<Vector3<f64>> {
    let roi = roi.clamp_to(frame.resolution());
    let mut points = Vec::with_capacity(roi.width() * roi.height());
    for y in roi.y0..roi.y1 {
        for x in roi.x0..roi.x1 {
            let d = frame.get(x, y);
            if d > 0.0 {
                points.push(sensor.to_world(x as f64, y as f64, d as f64));
            }
        }
    }
    points
}

/// Fit a plane to the surface seen inside `roi` shrunk by `scale` around its
/// centre, staying clear of the walls.
pub fn fit_surface_plane(
    frame: &ImageF32,
    roi: &Roi,
    scale: f64,
    sensor: &SensorModel,
) -> Option<PlaneEquation> {
    let inner = roi.scaled_from_center(scale);
    let points = sample_world_points(frame, &inner, sensor);
    debug!("fit_surface_plane: {} points in {}", points.len(), inner);
    fit_plane(&points)
}

/// Lowest depth still accepted by the filter: the plane's depth-axis height
/// brought `safe_range` closer to the sensor.
pub fn max_offset_from_plane(eq: &PlaneEquation, safe_range: f64) -> Option<f64> {
    (eq.normal.z != 0.0).then(|| -eq.offset / eq.normal.z - safe_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_and_reset() {
        let mut base = BasePlane::default().with_vertical_offset(-20.0);
        let eq = base.equation().unwrap();
        assert!((eq.elevation(&Vector3::new(0.0, 0.0, 800.0)) - 50.0).abs() < 1e-9);

        base = base.with_tilt(10.0, 0.0);
        let n = base.adjusted_normal();
        assert!((n.norm() - 1.0).abs() < 1e-12);
        assert!((n.z - 10f64.to_radians().cos()).abs() < 1e-12);

        base.reset();
        assert_eq!(base.adjusted_normal(), Vector3::z());
        assert_eq!(base.base_depth(), 870.0);
    }

    #[test]
    fn from_fitted_equation() {
        let eq = PlaneEquation::from_point_normal(&Vector3::new(10.0, 0.0, 900.0), &Vector3::z())
            .unwrap();
        let base = BasePlane::from_equation(&eq).unwrap();
        assert_eq!(base.point, Vector3::new(0.0, 0.0, 900.0));
        assert_eq!(max_offset_from_plane(&eq, 50.0), Some(850.0));
    }

    #[test]
    fn surface_fit_ignores_empty_pixels() {
        let sensor = SensorModel::default();
        let mut frame = ImageF32::new(40, 30);
        frame.fill(850.0);
        frame.set(20, 15, 0.0);
        let eq = fit_surface_plane(&frame, &Roi::new(0, 0, 40, 30), 0.75, &sensor).unwrap();
        assert!((eq.normal.z.abs() - 1.0).abs() < 1e-9);
        assert!((max_offset_from_plane(&eq, 50.0).unwrap() - 800.0).abs() < 1e-6);
    }
}
