//! Chessboard pattern shown on the display and the corner detector seam.
//!
//! The board is drawn as `squares_x × squares_y` cells covering a square of
//! `size` display pixels. Its inner corners are reported row by row (y outer,
//! x inner); detectors must return sensor corners in the same order so the
//! two lists pair up index by index.
use crate::image::ColorFrame;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Board geometry shared by every target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardLayout {
    /// Edge length of the drawn board in display pixels.
    pub size: f64,
    /// Number of squares along x.
    pub squares_x: usize,
    /// Number of squares along y.
    pub squares_y: usize,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            size: 300.0,
            squares_x: 5,
            squares_y: 4,
        }
    }
}

impl BoardLayout {
    /// Inner corner grid as `(columns, rows)`.
    pub fn inner_corners(&self) -> (usize, usize) {
        (
            self.squares_x.saturating_sub(1),
            self.squares_y.saturating_sub(1),
        )
    }

    pub fn corner_count(&self) -> usize {
        let (cols, rows) = self.inner_corners();
        cols * rows
    }

    /// Board of this layout centred on `center`.
    pub fn at(&self, center: Vector2<f64>) -> BoardPattern {
        BoardPattern {
            layout: *self,
            center,
        }
    }
}

/// One board placement on the display.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardPattern {
    pub layout: BoardLayout,
    /// Board centre in display pixels.
    pub center: Vector2<f64>,
}

impl BoardPattern {
    /// Top-left corner of the drawn board.
    pub fn origin(&self) -> Vector2<f64> {
        self.center - Vector2::repeat(self.layout.size * 0.5)
    }

    /// Size of one cell; cells are not square unless `squares_x == squares_y`.
    pub fn square_size(&self) -> Vector2<f64> {
        let l = &self.layout;
        Vector2::new(
            l.size / l.squares_x.max(1) as f64,
            l.size / l.squares_y.max(1) as f64,
        )
    }

    /// Display position of every inner corner, row-major.
    pub fn inner_corners(&self) -> Vec<Vector2<f64>> {
        let (cols, rows) = self.layout.inner_corners();
        let origin = self.origin();
        let cell = self.square_size();
        let mut corners = Vec::with_capacity(cols * rows);
        for j in 1..=rows {
            for i in 1..=cols {
                corners.push(origin + Vector2::new(i as f64 * cell.x, j as f64 * cell.y));
            }
        }
        corners
    }

    /// True when cell `(i, j)` is drawn black. The top-left cell is black.
    pub fn is_dark(&self, i: usize, j: usize) -> bool {
        (i + j) % 2 == 0
    }
}

/// Finds the inner corners of a displayed board in a color frame.
///
/// Implementations return sensor pixel coordinates, row-major in the same
/// order as [`BoardPattern::inner_corners`], or `None` when the full grid is
/// not visible.
pub trait CornerDetector {
    fn detect(&mut self, color: &ColorFrame, layout: &BoardLayout) -> Option<Vec<Vector2<f64>>>;
}

impl<F> CornerDetector for F
where
    F: FnMut(&ColorFrame, &BoardLayout) -> Option<Vec<Vector2<f64>>>,
{
    fn detect(&mut self, color: &ColorFrame, layout: &BoardLayout) -> Option<Vec<Vector2<f64>>> {
        self(color, layout)
    }
}
