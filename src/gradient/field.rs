//! Block-wise slope estimate of the filtered depth frame.
//!
//! The frame is tiled into `R × R` cells. For a cell fully inside the ROI:
//!
//! - `gx` averages `(left − right) / R` over the rows whose left-most and
//!   right-most samples are both non-zero;
//! - `gy` averages `(top − bottom) / R` over the columns likewise.
//!
//! Cells that straddle the ROI border, or have no usable pair on an axis,
//! yield zero on that axis. Vectors longer than the configured maximum are
//! scaled down to it. The field is rebuilt from scratch every cycle.
use super::options::GradientOptions;
use crate::image::{ImageF32, ImageView};
use crate::types::{Resolution, Roi};
use nalgebra::Vector2;

#[derive(Clone, Debug, PartialEq)]
pub struct GradientField {
    cols: usize,
    rows: usize,
    resolution: usize,
    data: Vec<Vector2<f32>>,
}

impl GradientField {
    /// Zero field for a sensor of size `res`.
    pub fn new(res: Resolution, resolution: usize) -> Self {
        let resolution = resolution.max(2);
        let cols = res.width / resolution;
        let rows = res.height / resolution;
        Self {
            cols,
            rows,
            resolution,
            data: vec![Vector2::zeros(); cols * rows],
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn cell(&self, col: usize, row: usize) -> Vector2<f32> {
        self.data[row * self.cols + col]
    }

    pub fn cells(&self) -> &[Vector2<f32>] {
        &self.data
    }

    /// Vector of the cell containing sensor pixel `(x, y)`; zero off the field.
    pub fn at_sensor(&self, x: f32, y: f32) -> Vector2<f32> {
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            return Vector2::zeros();
        }
        let col = (x / self.resolution as f32) as usize;
        let row = (y / self.resolution as f32) as usize;
        if col < self.cols && row < self.rows {
            self.cell(col, row)
        } else {
            Vector2::zeros()
        }
    }

    /// Recompute every cell from `frame` inside `roi`.
    pub fn sample(&mut self, frame: &ImageF32, roi: &Roi, opts: &GradientOptions) {
        let expected = Self::new(frame.resolution(), self.resolution);
        if expected.cols != self.cols || expected.rows != self.rows {
            *self = expected;
        }
        if self.cols == 0 {
            return;
        }
        let (cols, r) = (self.cols, self.resolution);

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.data
                .par_chunks_mut(cols)
                .enumerate()
                .for_each(|(row, cells)| sample_row(frame, roi, opts, r, row, cells));
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.data
                .chunks_mut(cols)
                .enumerate()
                .for_each(|(row, cells)| sample_row(frame, roi, opts, r, row, cells));
        }
    }
}

fn sample_row(
    frame: &ImageF32,
    roi: &Roi,
    opts: &GradientOptions,
    r: usize,
    row: usize,
    cells: &mut [Vector2<f32>],
) {
    let py0 = row * r;
    for (col, cell) in cells.iter_mut().enumerate() {
        let px0 = col * r;
        *cell = if roi.contains_rect(px0, py0, px0 + r, py0 + r) {
            clamp_magnitude(cell_slope(frame, px0, py0, r), opts.max_magnitude)
        } else {
            Vector2::zeros()
        };
    }
}

fn cell_slope(frame: &ImageF32, px0: usize, py0: usize, r: usize) -> Vector2<f32> {
    let (px1, py1) = (px0 + r - 1, py0 + r - 1);
    let rf = r as f32;

    let (mut sum_x, mut n_x) = (0.0f32, 0usize);
    for y in py0..=py1 {
        let row = frame.row(y);
        let (left, right) = (row[px0], row[px1]);
        if left != 0.0 && right != 0.0 {
            sum_x += (left - right) / rf;
            n_x += 1;
        }
    }

    let (top, bottom) = (frame.row(py0), frame.row(py1));
    let (mut sum_y, mut n_y) = (0.0f32, 0usize);
    for x in px0..=px1 {
        if top[x] != 0.0 && bottom[x] != 0.0 {
            sum_y += (top[x] - bottom[x]) / rf;
            n_y += 1;
        }
    }

    let gx = if n_x > 0 { sum_x / n_x as f32 } else { 0.0 };
    let gy = if n_y > 0 { sum_y / n_y as f32 } else { 0.0 };
    Vector2::new(gx, gy)
}

#[inline]
fn clamp_magnitude(v: Vector2<f32>, max: f32) -> Vector2<f32> {
    let norm = v.norm();
    if norm > max && norm > 0.0 {
        v * (max / norm)
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize, base: f32, dx: f32, dy: f32) -> ImageF32 {
        let mut img = ImageF32::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, base + dx * x as f32 + dy * y as f32);
            }
        }
        img
    }

    #[test]
    fn linear_ramp_gives_uniform_slope() {
        let img = ramp(40, 30, 1000.0, -2.0, 1.0);
        let res = img.resolution();
        let mut field = GradientField::new(res, 10);
        field.sample(&img, &Roi::full(res), &GradientOptions::default());
        assert_eq!((field.cols(), field.rows()), (4, 3));
        for v in field.cells() {
            // left − right over 9 px, divided by R = 10.
            assert!((v.x - 1.8).abs() < 1e-3);
            assert!((v.y + 0.9).abs() < 1e-3);
        }
    }

    #[test]
    fn cells_crossing_roi_are_zero() {
        let img = ramp(40, 30, 1000.0, -2.0, 0.0);
        let res = img.resolution();
        let mut field = GradientField::new(res, 10);
        field.sample(&img, &Roi::new(5, 0, 40, 30), &GradientOptions::default());
        for row in 0..3 {
            assert_eq!(field.cell(0, row), Vector2::zeros());
            assert!(field.cell(1, row).x > 0.0);
        }
    }

    #[test]
    fn zero_samples_are_skipped_and_magnitude_is_scaled() {
        let mut img = ramp(10, 10, 8000.0, -300.0, -400.0);
        for y in 0..5 {
            img.set(0, y, 0.0);
        }
        let res = img.resolution();
        let mut field = GradientField::new(res, 10);
        let opts = GradientOptions::default().with_max_magnitude(100.0);
        field.sample(&img, &Roi::full(res), &opts);
        let v = field.cell(0, 0);
        assert!((v.norm() - 100.0).abs() < 1e-2);
        assert!((v.x / v.y - 0.75).abs() < 1e-3);
    }

    #[test]
    fn lookup_outside_field_is_zero() {
        let img = ramp(20, 20, 1000.0, -1.0, 0.0);
        let res = img.resolution();
        let mut field = GradientField::new(res, 10);
        field.sample(&img, &Roi::full(res), &GradientOptions::default());
        assert!(field.at_sensor(15.0, 5.0).x > 0.0);
        assert_eq!(field.at_sensor(25.0, 5.0), Vector2::zeros());
        assert_eq!(field.at_sensor(-1.0, 5.0), Vector2::zeros());
    }
}
