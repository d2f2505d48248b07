//! Synchronous per-cycle processing: temporal filter → smoothing → gradient.
//!
//! [`SurfacePipeline`] owns every per-pixel buffer. It is driven by the
//! producer worker but can be used directly for offline processing and tests.
pub mod params;

pub use params::{DepthPreviewOptions, SurfaceParams};

use crate::diagnostics::{CycleReport, CycleTimer};
use crate::filter::{SpatialSmoother, TemporalFilter};
use crate::gradient::{GradientField, GradientOptions};
use crate::image::io::depth_to_gray;
use crate::image::{GrayFrame, ImageF32, ImageU16};
use crate::types::{Resolution, Roi};
use log::debug;

pub struct SurfacePipeline {
    temporal: TemporalFilter,
    smoother: SpatialSmoother,
    gradient: GradientField,
    gradient_opts: GradientOptions,
    preview: DepthPreviewOptions,
    cycle: u64,
}

impl SurfacePipeline {
    pub fn new(res: Resolution, roi: Roi, params: SurfaceParams) -> Self {
        let gradient_opts = params
            .gradient
            .with_resolution(params.gradient.resolution);
        Self {
            temporal: TemporalFilter::new(res, roi, params.temporal),
            smoother: SpatialSmoother::new(params.smoothing),
            gradient: GradientField::new(res, gradient_opts.resolution),
            gradient_opts,
            preview: params.preview,
            cycle: 0,
        }
    }

    /// Run one cycle on `raw`.
    pub fn process(&mut self, raw: ImageU16<'_>) -> CycleReport {
        self.cycle += 1;
        let roi = self.temporal.roi();
        let mut timer = CycleTimer::start();

        let temporal = self.temporal.update(raw);
        timer.lap("temporal");

        if temporal.processed {
            self.smoother.apply(self.temporal.filtered_mut(), &roi);
            timer.lap("spatial");
            self.gradient
                .sample(self.temporal.filtered(), &roi, &self.gradient_opts);
            timer.lap("gradient");
        }
        let timings = timer.finish();

        let report = CycleReport {
            cycle: self.cycle,
            processed: temporal.processed,
            roi,
            stable_pixels: temporal.stable_pixels,
            big_changes: temporal.big_changes,
            accepted_samples: temporal.accepted_samples,
            stabilized: self.temporal.is_stabilized(),
            timings,
        };
        debug!(
            "SurfacePipeline cycle {}: stable={:.1}% big_changes={} total={:.3}ms",
            report.cycle,
            report.stable_fraction() * 100.0,
            report.big_changes,
            report.timings.total_ms
        );
        report
    }

    pub fn filtered(&self) -> &ImageF32 {
        self.temporal.filtered()
    }

    pub fn gradient(&self) -> &GradientField {
        &self.gradient
    }

    /// Grayscale render of the filtered frame over the preview depth range.
    pub fn depth_view(&self) -> GrayFrame {
        depth_to_gray(self.temporal.filtered(), self.preview.near, self.preview.far)
    }

    pub fn temporal(&self) -> &TemporalFilter {
        &self.temporal
    }

    pub fn is_stabilized(&self) -> bool {
        self.temporal.is_stabilized()
    }

    pub fn roi(&self) -> Roi {
        self.temporal.roi()
    }

    pub fn resolution(&self) -> Resolution {
        self.temporal.resolution()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current parameter set, including runtime changes.
    pub fn params(&self) -> SurfaceParams {
        SurfaceParams {
            temporal: *self.temporal.options(),
            smoothing: *self.smoother.options(),
            gradient: self.gradient_opts,
            preview: self.preview,
        }
    }

    /// Changes the processed region; all per-pixel buffers are reset.
    pub fn set_roi(&mut self, roi: Roi) {
        self.temporal.set_roi(roi);
        self.gradient = GradientField::new(self.resolution(), self.gradient_opts.resolution);
    }

    pub fn set_averaging_slots(&mut self, slots: usize) {
        self.temporal.set_averaging_slots(slots);
    }

    pub fn set_valid_floor(&mut self, floor: f32) {
        self.temporal.set_valid_floor(floor);
    }

    pub fn set_follow_big_change(&mut self, follow: bool) {
        self.temporal.set_follow_big_change(follow);
    }

    pub fn set_spatial_filtering(&mut self, enabled: bool) {
        self.smoother.set_enabled(enabled);
    }

    pub fn set_gradient_resolution(&mut self, resolution: usize) {
        self.gradient_opts = self.gradient_opts.with_resolution(resolution);
        self.gradient = GradientField::new(self.resolution(), self.gradient_opts.resolution);
    }

    pub fn reset(&mut self) {
        self.temporal.reset();
        self.gradient = GradientField::new(self.resolution(), self.gradient_opts.resolution);
    }
}
