//! Filtered depth frame: one f32 per sensor pixel, rows tightly packed.
//!
//! Values are raw sensor depth units; 0 marks pixels outside the processed
//! region.
use super::traits::ImageView;
use crate::types::{Resolution, Roi};

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    pub w: usize,
    pub h: usize,
    /// Row-major samples, `w * h` long.
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// All-zero frame, i.e. nothing processed yet.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    /// `None` if `data.len() != w * h`.
    pub fn from_vec(w: usize, h: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == w * h).then_some(Self { w, h, data })
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.w, self.h)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.w + x] = v;
    }

    /// Depth at fractional sensor coordinates, truncated to the pixel grid.
    pub fn sample(&self, x: f64, y: f64) -> Option<f32> {
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            return None;
        }
        let (xi, yi) = (x as usize, y as usize);
        (xi < self.w && yi < self.h).then(|| self.get(xi, yi))
    }

    pub fn fill(&mut self, v: f32) {
        self.data.fill(v);
    }

    /// `inside` on the ROI, `outside` everywhere else.
    pub fn fill_split(&mut self, roi: &Roi, inside: f32, outside: f32) {
        if self.w == 0 {
            return;
        }
        for (y, row) in self.data.chunks_exact_mut(self.w).enumerate() {
            for (x, px) in row.iter_mut().enumerate() {
                *px = if roi.contains(x, y) { inside } else { outside };
            }
        }
    }
}

impl ImageView for ImageF32 {
    type Pixel = f32;

    fn width(&self) -> usize {
        self.w
    }

    fn height(&self) -> usize {
        self.h
    }

    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.w..(y + 1) * self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rejects_out_of_frame_coordinates() {
        let mut img = ImageF32::new(4, 3);
        img.set(3, 2, 950.0);
        assert_eq!(img.sample(3.9, 2.5), Some(950.0));
        assert_eq!(img.sample(4.0, 0.0), None);
        assert_eq!(img.sample(-0.5, 1.0), None);
        assert_eq!(img.sample(f64::NAN, 1.0), None);
    }

    #[test]
    fn fill_split_marks_roi() {
        let mut img = ImageF32::new(4, 3);
        img.fill_split(&Roi::new(1, 1, 3, 2), 4000.0, 0.0);
        assert_eq!(img.row(1), &[0.0, 4000.0, 4000.0, 0.0]);
        assert!(img.row(0).iter().all(|&v| v == 0.0));
    }
}
