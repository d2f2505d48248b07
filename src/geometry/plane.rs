//! Best-fit plane through world points.
//!
//! The fit eliminates the coordinate whose 2×2 cofactor of the covariance is
//! best conditioned, solves the remaining 2×2 normal equations by Cramer's
//! rule and normalizes the resulting direction. The plane satisfies
//! `normal · p + offset = 0`; elevation is measured along `-normal`, so with
//! the usual `+z` normal (depth axis pointing away from the sensor) points
//! closer to the sensor have positive elevation.
use log::warn;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Cofactors at or below `REL_DEGENERACY · trace²` are treated as zero.
const REL_DEGENERACY: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneEquation {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl PlaneEquation {
    /// Plane through `point` with the given (not necessarily unit) normal.
    ///
    /// Returns `None` for a zero normal.
    pub fn from_point_normal(point: &Vector3<f64>, normal: &Vector3<f64>) -> Option<Self> {
        let n = normal.try_normalize(f64::EPSILON)?;
        Some(Self {
            normal: n,
            offset: -n.dot(point),
        })
    }

    /// `normal · p + offset`.
    #[inline]
    pub fn signed_distance(&self, p: &Vector3<f64>) -> f64 {
        self.normal.dot(p) + self.offset
    }

    /// Height of `p` above the plane.
    #[inline]
    pub fn elevation(&self, p: &Vector3<f64>) -> f64 {
        -self.signed_distance(p)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

/// Fit a plane to `points`.
///
/// Returns `None` when fewer than three points are given or the points do
/// not span a plane (coincident or collinear).
pub fn fit_plane(points: &[Vector3<f64>]) -> Option<PlaneEquation> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;

    let (mut xx, mut xy, mut xz, mut yy, mut yz, mut zz) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        let r = p - centroid;
        xx += r.x * r.x;
        xy += r.x * r.y;
        xz += r.x * r.z;
        yy += r.y * r.y;
        yz += r.y * r.z;
        zz += r.z * r.z;
    }

    let det_x = yy * zz - yz * yz;
    let det_y = xx * zz - xz * xz;
    let det_z = xx * yy - xy * xy;

    let (axis, det) = [(Axis::X, det_x), (Axis::Y, det_y), (Axis::Z, det_z)]
        .into_iter()
        .fold((Axis::X, 0.0f64), |best, cand| {
            if cand.1.abs() > best.1.abs() {
                cand
            } else {
                best
            }
        });

    let trace = xx + yy + zz;
    if det == 0.0 || det.abs() <= REL_DEGENERACY * trace * trace {
        warn!(
            "fit_plane: {} points do not span a plane (det={det:e})",
            points.len()
        );
        return None;
    }

    let dir = match axis {
        Axis::X => Vector3::new(
            1.0,
            (xz * yz - xy * zz) / det,
            (xy * yz - xz * yy) / det,
        ),
        Axis::Y => Vector3::new(
            (yz * xz - xy * zz) / det,
            1.0,
            (xy * xz - yz * xx) / det,
        ),
        Axis::Z => Vector3::new(
            (yz * xy - xz * yy) / det,
            (xz * xy - yz * xx) / det,
            1.0,
        ),
    };
    PlaneEquation::from_point_normal(&centroid, &dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_on_plane(a: f64, b: f64, c: f64) -> Vec<Vector3<f64>> {
        let mut pts = Vec::new();
        for i in 0..5 {
            for j in 0..4 {
                let (x, y) = (i as f64 * 100.0 - 200.0, j as f64 * 80.0 - 120.0);
                pts.push(Vector3::new(x, y, a * x + b * y + c));
            }
        }
        pts
    }

    #[test]
    fn recovers_tilted_plane() {
        let pts = grid_on_plane(0.1, -0.05, 870.0);
        let plane = fit_plane(&pts).unwrap();
        let expected = Vector3::new(-0.1, 0.05, 1.0).normalize();
        assert!((plane.normal - expected).norm() < 1e-9);
        for p in &pts {
            assert!(plane.signed_distance(p).abs() < 1e-9);
        }
    }

    #[test]
    fn points_nearer_the_sensor_are_above() {
        let plane = fit_plane(&grid_on_plane(0.0, 0.0, 870.0)).unwrap();
        assert!((plane.offset + 870.0).abs() < 1e-9);
        assert!((plane.elevation(&Vector3::new(0.0, 0.0, 800.0)) - 70.0).abs() < 1e-9);
        assert!(plane.elevation(&Vector3::new(0.0, 0.0, 900.0)) < 0.0);
    }

    #[test]
    fn vertical_plane_uses_another_axis() {
        let pts: Vec<_> = (0..4)
            .flat_map(|i| (0..4).map(move |j| Vector3::new(50.0, i as f64 * 10.0, j as f64 * 7.0)))
            .collect();
        let plane = fit_plane(&pts).unwrap();
        assert!((plane.normal - Vector3::x()).norm() < 1e-12);
        assert!((plane.offset + 50.0).abs() < 1e-12);
    }

    #[test]
    fn collinear_and_short_inputs_are_degenerate() {
        let line = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.1, 0.2, 0.3),
            Vector3::new(0.2, 0.4, 0.6),
        ];
        assert!(fit_plane(&line).is_none());
        let same = [Vector3::new(1.0, 2.0, 3.0); 5];
        assert!(fit_plane(&same).is_none());
        assert!(fit_plane(&line[..2]).is_none());
    }

    #[test]
    fn fit_is_deterministic() {
        let pts = grid_on_plane(0.3, 0.2, 900.0);
        let a = fit_plane(&pts).unwrap();
        let b = fit_plane(&pts).unwrap();
        assert_eq!(a.normal.x.to_bits(), b.normal.x.to_bits());
        assert_eq!(a.normal.y.to_bits(), b.normal.y.to_bits());
        assert_eq!(a.normal.z.to_bits(), b.normal.z.to_bits());
        assert_eq!(a.offset.to_bits(), b.offset.to_bits());
    }
}
