//! Display positions the board is shown at during calibration.
//!
//! Targets are stored as offsets from the display centre so a failing target
//! can be pulled inward by scaling its offset.
use crate::types::Resolution;
use nalgebra::Vector2;

/// Which sand configuration a target is captured on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetLevel {
    /// Bare sand at the base plane.
    Low,
    /// Flat board laid over the sand.
    High,
}

#[derive(Clone, Debug)]
pub struct TargetSchedule {
    center: Vector2<f64>,
    offsets: Vec<Vector2<f64>>,
    per_level: usize,
}

impl TargetSchedule {
    /// Ten targets for a board of `board_size` display pixels: the four
    /// inner corners plus one side point per level, the high level inset a
    /// little further.
    pub fn new(display: Resolution, board_size: f64) -> Self {
        let (w, h) = (display.width as f64, display.height as f64);
        let center = Vector2::new(w * 0.5, h * 0.5);
        let near = 2.0 * board_size / 3.0;
        let far = 3.0 * board_size / 4.0;
        let corners = |m: f64| {
            [
                Vector2::new(m, m),
                Vector2::new(w - m, m),
                Vector2::new(w - m, h - m),
                Vector2::new(m, h - m),
            ]
        };
        let mut positions = Vec::with_capacity(10);
        positions.extend(corners(near));
        positions.push(Vector2::new(w * 0.5 + near, h * 0.5));
        positions.extend(corners(far));
        positions.push(Vector2::new(w * 0.5 - near, h * 0.5));
        Self {
            center,
            offsets: positions.into_iter().map(|p| p - center).collect(),
            per_level: 5,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn per_level(&self) -> usize {
        self.per_level
    }

    pub fn level(&self, index: usize) -> TargetLevel {
        if index < self.per_level {
            TargetLevel::Low
        } else {
            TargetLevel::High
        }
    }

    /// Display position of target `index`.
    pub fn position(&self, index: usize) -> Option<Vector2<f64>> {
        self.offsets.get(index).map(|o| self.center + o)
    }

    /// Pull target `index` toward the centre by `factor` (< 1).
    pub fn shrink(&mut self, index: usize, factor: f64) {
        if let Some(o) = self.offsets.get_mut(index) {
            *o *= factor;
        }
    }
}
