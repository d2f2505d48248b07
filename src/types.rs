use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of a sensor or display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned region of interest in sensor pixels.
///
/// Bounds are half-open: a pixel `(x, y)` is inside when
/// `x0 <= x < x1` and `y0 <= y < y1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Roi {
    pub const fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// ROI covering the whole frame.
    pub const fn full(res: Resolution) -> Self {
        Self::new(0, 0, res.width, res.height)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// True when the rectangle `[x0, x1) × [y0, y1)` lies entirely inside.
    #[inline]
    pub fn contains_rect(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> bool {
        x0 >= self.x0 && y0 >= self.y0 && x1 <= self.x1 && y1 <= self.y1
    }

    /// Clip to the frame; a degenerate result collapses to an empty ROI.
    pub fn clamp_to(&self, res: Resolution) -> Self {
        let x1 = self.x1.min(res.width);
        let y1 = self.y1.min(res.height);
        Self {
            x0: self.x0.min(x1),
            y0: self.y0.min(y1),
            x1,
            y1,
        }
    }

    pub fn intersect(&self, other: &Roi) -> Self {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1).max(x0);
        let y1 = self.y1.min(other.y1).max(y0);
        Self { x0, y0, x1, y1 }
    }

    /// Shrink or grow around the center by `factor`.
    pub fn scaled_from_center(&self, factor: f64) -> Self {
        let cx = (self.x0 + self.x1) as f64 * 0.5;
        let cy = (self.y0 + self.y1) as f64 * 0.5;
        let hw = self.width() as f64 * 0.5 * factor;
        let hh = self.height() as f64 * 0.5 * factor;
        Self {
            x0: (cx - hw).max(0.0).round() as usize,
            y0: (cy - hh).max(0.0).round() as usize,
            x1: (cx + hw).max(0.0).round() as usize,
            y1: (cy + hh).max(0.0).round() as usize,
        }
    }

    /// Build from a floating-point rectangle, rounding inward.
    pub fn from_bounds_f64(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<Self> {
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }
        let x0 = min_x.ceil().max(0.0) as usize;
        let y0 = min_y.ceil().max(0.0) as usize;
        let x1 = max_x.floor().max(0.0) as usize;
        let y1 = max_y.floor().max(0.0) as usize;
        (x1 > x0 && y1 > y0).then_some(Self { x0, y0, x1, y1 })
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) x [{}, {})", self.x0, self.x1, self.y0, self.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_roi_stays_centered() {
        let roi = Roi::new(100, 40, 500, 440);
        let inner = roi.scaled_from_center(0.75);
        assert_eq!(inner, Roi::new(150, 90, 450, 390));
        assert!(roi.contains_rect(inner.x0, inner.y0, inner.x1, inner.y1));
    }

    #[test]
    fn intersection_never_inverts() {
        let a = Roi::new(0, 0, 10, 10);
        let b = Roi::new(20, 20, 30, 30);
        assert!(a.intersect(&b).is_empty());
        assert_eq!(
            Roi::new(0, 0, 10, 10).intersect(&Roi::new(5, 2, 30, 8)),
            Roi::new(5, 2, 10, 8)
        );
    }

    #[test]
    fn clamp_to_frame() {
        let res = Resolution::new(64, 48);
        assert_eq!(Roi::new(10, 10, 100, 100).clamp_to(res), Roi::new(10, 10, 64, 48));
        assert!(Roi::new(80, 60, 100, 100).clamp_to(res).is_empty());
    }
}
