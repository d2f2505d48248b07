//! Separable smoothing of the filtered frame restricted to the ROI.
//!
//! Each pass convolves columns first and rows second with a short symmetric
//! kernel. Taps falling outside the ROI are skipped and the remaining weights
//! renormalized, so border pixels never mix with data outside the ROI.
use super::options::SmoothingOptions;
use crate::image::{ImageF32, ImageView};
use crate::types::Roi;

/// Trait implemented by separable 1D kernels.
pub trait SeparableFilter {
    /// Return the 1D taps (in left-to-right order). The kernel is centred on
    /// the middle tap; an odd length is expected.
    fn taps(&self) -> &[f32];
}

/// Simple wrapper around a static filter kernel.
#[derive(Clone, Copy, Debug)]
pub struct StaticSeparableFilter {
    taps: &'static [f32],
}

impl Default for StaticSeparableFilter {
    fn default() -> Self {
        BINOMIAL_3TAP
    }
}

impl StaticSeparableFilter {
    pub const fn new(taps: &'static [f32]) -> Self {
        Self { taps }
    }
}

impl SeparableFilter for StaticSeparableFilter {
    #[inline]
    fn taps(&self) -> &[f32] {
        self.taps
    }
}

/// Normalised 3-tap binomial filter `[1, 2, 1] / 4`.
pub const BINOMIAL_3TAP: StaticSeparableFilter = StaticSeparableFilter::new(&[0.25, 0.5, 0.25]);

/// Applies the smoothing passes; keeps a scratch copy of the ROI between calls.
#[derive(Debug)]
pub struct SpatialSmoother<F: SeparableFilter = StaticSeparableFilter> {
    filter: F,
    opts: SmoothingOptions,
    scratch: Vec<f32>,
}

impl SpatialSmoother {
    pub fn new(opts: SmoothingOptions) -> Self {
        Self::with_filter(BINOMIAL_3TAP, opts)
    }
}

impl<F: SeparableFilter> SpatialSmoother<F> {
    pub fn with_filter(filter: F, opts: SmoothingOptions) -> Self {
        Self {
            filter,
            opts,
            scratch: Vec::new(),
        }
    }

    pub fn options(&self) -> &SmoothingOptions {
        &self.opts
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.opts.enabled = enabled;
    }

    /// Smooth `frame` in place inside `roi`. No-op when disabled.
    pub fn apply(&mut self, frame: &mut ImageF32, roi: &Roi) {
        let roi = roi.clamp_to(frame.resolution());
        if !self.opts.enabled || roi.is_empty() {
            return;
        }
        for _ in 0..self.opts.passes {
            self.pass(frame, &roi, Axis::Vertical);
            self.pass(frame, &roi, Axis::Horizontal);
        }
    }

    fn pass(&mut self, frame: &mut ImageF32, roi: &Roi, axis: Axis) {
        let (rw, rh) = (roi.width(), roi.height());
        self.scratch.clear();
        self.scratch.reserve(rw * rh);
        for y in roi.y0..roi.y1 {
            self.scratch.extend_from_slice(frame.roi_row(y, roi));
        }

        let taps = self.filter.taps();
        let src = RoiBuffer {
            data: &self.scratch,
            w: rw,
            h: rh,
        };
        let w = frame.w;
        let (x0, y0) = (roi.x0, roi.y0);

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            frame
                .data
                .par_chunks_mut(w)
                .skip(y0)
                .take(rh)
                .enumerate()
                .for_each(|(ry, row)| convolve_row(&src, taps, axis, ry, &mut row[x0..x0 + rw]));
        }
        #[cfg(not(feature = "parallel"))]
        {
            frame
                .data
                .chunks_mut(w)
                .skip(y0)
                .take(rh)
                .enumerate()
                .for_each(|(ry, row)| convolve_row(&src, taps, axis, ry, &mut row[x0..x0 + rw]));
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Vertical,
    Horizontal,
}

struct RoiBuffer<'a> {
    data: &'a [f32],
    w: usize,
    h: usize,
}

/// Write output row `ry` (ROI-relative) of one directional pass.
fn convolve_row(src: &RoiBuffer<'_>, taps: &[f32], axis: Axis, ry: usize, out: &mut [f32]) {
    let radius = (taps.len() / 2) as isize;
    for (rx, px) in out.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        let mut weight = 0.0f32;
        for (k, &t) in taps.iter().enumerate() {
            let off = k as isize - radius;
            let (sx, sy) = match axis {
                Axis::Vertical => (rx as isize, ry as isize + off),
                Axis::Horizontal => (rx as isize + off, ry as isize),
            };
            if sx < 0 || sy < 0 || sx >= src.w as isize || sy >= src.h as isize {
                continue;
            }
            acc += t * src.data[sy as usize * src.w + sx as usize];
            weight += t;
        }
        if weight > 0.0 {
            *px = acc / weight;
        }
    }
}
