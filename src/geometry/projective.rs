//! World → display projective calibration (11-parameter DLT).
//!
//! For each correspondence `(X, Y, Z) ↔ (u, v)` two rows are written by
//! clearing the projective denominator:
//!
//! ```text
//! [X Y Z 1 0 0 0 0 -uX -uY -uZ] · c = u
//! [0 0 0 0 X Y Z 1 -vX -vY -vZ] · c = v
//! ```
//!
//! The stacked `2N × 11` system is solved in the least-squares sense with a
//! Householder QR factorization. Columns are scaled to unit norm first since
//! world coordinates (millimetres) and their products with display pixels
//! differ by several orders of magnitude.
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Matrix4, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewest correspondences that determine the 11 unknowns.
pub const MIN_CORRESPONDENCES: usize = 6;

const EPS: f64 = 1e-12;

/// One world point and the display pixel it was observed at.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub world: Vector3<f64>,
    pub display: Vector2<f64>,
}

impl Correspondence {
    pub fn new(world: Vector3<f64>, display: Vector2<f64>) -> Self {
        Self { world, display }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("need at least {} correspondences, got {got}", MIN_CORRESPONDENCES)]
    TooFewPairs { got: usize },
    #[error("correspondences do not constrain all parameters (rank deficient system)")]
    RankDeficient,
}

/// Solved projective map; immutable once built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectiveCalibration {
    coefficients: [f64; 11],
}

impl ProjectiveCalibration {
    pub fn from_coefficients(coefficients: [f64; 11]) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[f64; 11] {
        &self.coefficients
    }

    /// 4×4 form; the last row is `[0 0 0 1]` and entry (2, 3) is fixed to 1.
    pub fn matrix(&self) -> Matrix4<f64> {
        let c = &self.coefficients;
        Matrix4::new(
            c[0], c[1], c[2], c[3], //
            c[4], c[5], c[6], c[7], //
            c[8], c[9], c[10], 1.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Display pixel of a world point; `None` when the point projects to
    /// infinity.
    pub fn project(&self, world: &Vector3<f64>) -> Option<Vector2<f64>> {
        let h = self.matrix() * Vector4::new(world.x, world.y, world.z, 1.0);
        if !h[2].is_finite() || h[2].abs() <= EPS {
            return None;
        }
        let p = Vector2::new(h[0] / h[2], h[1] / h[2]);
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }

    /// Root mean square reprojection error over `pairs`, in display pixels.
    pub fn reprojection_rmse(&self, pairs: &[Correspondence]) -> Option<f64> {
        if pairs.is_empty() {
            return None;
        }
        let mut sum = 0.0;
        for pair in pairs {
            sum += (self.project(&pair.world)? - pair.display).norm_squared();
        }
        Some((sum / pairs.len() as f64).sqrt())
    }
}

/// Least-squares solve of the projective map from `pairs`.
pub fn solve_projective(pairs: &[Correspondence]) -> Result<ProjectiveCalibration, SolveError> {
    if pairs.len() < MIN_CORRESPONDENCES {
        return Err(SolveError::TooFewPairs { got: pairs.len() });
    }

    let rows = 2 * pairs.len();
    let mut a = DMatrix::<f64>::zeros(rows, 11);
    let mut b = DVector::<f64>::zeros(rows);
    for (i, pair) in pairs.iter().enumerate() {
        let (x, y, z) = (pair.world.x, pair.world.y, pair.world.z);
        let (u, v) = (pair.display.x, pair.display.y);
        let r = 2 * i;
        for (j, val) in [x, y, z, 1.0].into_iter().enumerate() {
            a[(r, j)] = val;
            a[(r + 1, 4 + j)] = val;
        }
        for (j, val) in [x, y, z].into_iter().enumerate() {
            a[(r, 8 + j)] = -u * val;
            a[(r + 1, 8 + j)] = -v * val;
        }
        b[r] = u;
        b[r + 1] = v;
    }

    let mut scales = [1.0f64; 11];
    for (j, scale) in scales.iter_mut().enumerate() {
        let norm = a.column(j).norm();
        if norm <= EPS {
            warn!("solve_projective: column {j} is empty");
            return Err(SolveError::RankDeficient);
        }
        *scale = norm;
        a.column_mut(j).scale_mut(1.0 / norm);
    }

    let qr = a.qr();
    let r = qr.r();
    let max_diag = r.diagonal().amax();
    let min_diag = r.diagonal().iter().fold(f64::INFINITY, |m, d| m.min(d.abs()));
    if !(min_diag > max_diag * 1e-10) {
        warn!("solve_projective: triangular factor is singular (min |r_ii| = {min_diag:e})");
        return Err(SolveError::RankDeficient);
    }
    let qtb = qr.q().transpose() * b;
    let x = r
        .solve_upper_triangular(&qtb)
        .ok_or(SolveError::RankDeficient)?;

    let mut coefficients = [0.0f64; 11];
    for (j, c) in coefficients.iter_mut().enumerate() {
        *c = x[j] / scales[j];
    }
    let calibration = ProjectiveCalibration::from_coefficients(coefficients);
    if let Some(rmse) = calibration.reprojection_rmse(pairs) {
        debug!(
            "solve_projective: {} pairs, reprojection rmse {:.4} px",
            pairs.len(),
            rmse
        );
    }
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_short_input() {
        let pair = Correspondence::new(Vector3::new(1.0, 2.0, 3.0), Vector2::new(4.0, 5.0));
        assert_eq!(
            solve_projective(&[pair; 5]),
            Err(SolveError::TooFewPairs { got: 5 })
        );
        assert_eq!(
            solve_projective(&[]),
            Err(SolveError::TooFewPairs { got: 0 })
        );
    }

    #[test]
    fn coplanar_world_points_are_rank_deficient() {
        let truth = ProjectiveCalibration::from_coefficients([
            1.2, 0.05, -0.3, 400.0, 0.02, 1.1, -0.25, 300.0, 1e-5, 2e-5, 1e-4,
        ]);
        let pairs: Vec<_> = (0..4)
            .flat_map(|i| (0..3).map(move |j| Vector3::new(i as f64 * 90.0, j as f64 * 70.0, 800.0)))
            .map(|w| Correspondence::new(w, truth.project(&w).unwrap()))
            .collect();
        assert_eq!(solve_projective(&pairs), Err(SolveError::RankDeficient));
    }

    #[test]
    fn matrix_layout() {
        let cal = ProjectiveCalibration::from_coefficients([
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0,
        ]);
        let m = cal.matrix();
        assert_eq!(m[(0, 3)], 4.0);
        assert_eq!(m[(1, 0)], 5.0);
        assert_eq!(m[(2, 2)], 11.0);
        assert_eq!(m[(2, 3)], 1.0);
        assert_eq!(m.row(3), Matrix4::<f64>::identity().row(3));
    }
}
