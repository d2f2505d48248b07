//! Per-pixel temporal stability filter.
//!
//! Every pixel inside the ROI owns a ring of `K` averaging slots and running
//! statistics `(count, sum, sum_sq)` over the samples currently held by the
//! ring. One slot index is shared by all pixels and advances round-robin, so
//! each cycle overwrites exactly one slot per pixel and the statistics are
//! updated incrementally (add the new sample, drop the one it replaces).
//!
//! A pixel is stable when it holds at least `⌈(K+1)/2⌉` samples and
//! `count·sum_sq ≤ max_variance·count² + sum²`. Stable pixels publish their
//! running mean to the valid buffer once it moved by at least the hysteresis;
//! the filtered frame always mirrors the valid buffer.
//!
//! Layout: slots are stored pixel-major (`slots[p * K + k]`) in one arena so a
//! row of the frame maps to one contiguous chunk of every buffer.
use super::options::TemporalOptions;
use crate::image::{ImageF32, ImageU16, ImageView};
use crate::types::{Resolution, Roi};
use log::{debug, info, warn};

/// Marker for a slot that never received a sample since the last reset.
const EMPTY_SLOT: f32 = f32::NAN;

/// Running statistics of the samples held by one pixel's ring.
///
/// Samples are integral sensor values, so the f64 sums stay exact under
/// incremental add/remove.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelStats {
    pub count: u32,
    pub sum: f64,
    pub sum_sq: f64,
}

impl PixelStats {
    /// Statistics of `k` copies of `v`.
    #[inline]
    pub fn repeated(v: f32, k: usize) -> Self {
        let v = v as f64;
        let kf = k as f64;
        Self {
            count: k as u32,
            sum: kf * v,
            sum_sq: kf * v * v,
        }
    }

    #[inline]
    fn add(&mut self, v: f32) {
        let v = v as f64;
        self.count += 1;
        self.sum += v;
        self.sum_sq += v * v;
    }

    #[inline]
    fn remove(&mut self, v: f32) {
        let v = v as f64;
        self.count = self.count.saturating_sub(1);
        self.sum -= v;
        self.sum_sq -= v * v;
    }

    #[inline]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Stability test without division: `n·Σv² ≤ σ²_max·n² + (Σv)²`.
    #[inline]
    pub fn is_stable(&self, min_samples: u32, max_variance: f32) -> bool {
        let n = self.count as f64;
        self.count >= min_samples && n * self.sum_sq <= max_variance as f64 * n * n + self.sum * self.sum
    }
}

/// Per-cycle counters returned by [`TemporalFilter::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TemporalCycle {
    /// False when the frame was dropped (size mismatch).
    pub processed: bool,
    /// Pixels that passed the stability test this cycle.
    pub stable_pixels: usize,
    /// Pixels whose history was reset by the big-change override.
    pub big_changes: usize,
    /// Samples above the valid floor.
    pub accepted_samples: usize,
}

impl TemporalCycle {
    fn merge(mut self, other: Self) -> Self {
        self.stable_pixels += other.stable_pixels;
        self.big_changes += other.big_changes;
        self.accepted_samples += other.accepted_samples;
        self
    }
}

/// Parameters shared by all rows during one update.
#[derive(Clone, Copy)]
struct RowContext {
    x0: usize,
    x1: usize,
    k: usize,
    slot: usize,
    min_samples: u32,
    opts: TemporalOptions,
}

pub struct TemporalFilter {
    res: Resolution,
    roi: Roi,
    opts: TemporalOptions,
    slots: Vec<f32>,
    stats: Vec<PixelStats>,
    valid: Vec<f32>,
    filtered: ImageF32,
    slot_index: usize,
    init_frames: usize,
    stabilized: bool,
}

impl TemporalFilter {
    /// Allocate the buffers for `res` and reset them with the given ROI.
    pub fn new(res: Resolution, roi: Roi, opts: TemporalOptions) -> Self {
        let opts = opts.with_averaging_slots(opts.averaging_slots);
        let pixels = res.pixel_count();
        let mut filter = Self {
            res,
            roi: roi.clamp_to(res),
            opts,
            slots: vec![EMPTY_SLOT; pixels * opts.averaging_slots],
            stats: vec![PixelStats::default(); pixels],
            valid: vec![opts.initial_value; pixels],
            filtered: ImageF32::new(res.width, res.height),
            slot_index: 0,
            init_frames: 0,
            stabilized: false,
        };
        filter.reset();
        filter
    }

    /// Drop every sample and restart the stabilization countdown.
    pub fn reset(&mut self) {
        let k = self.opts.averaging_slots;
        self.slots.clear();
        self.slots.resize(self.res.pixel_count() * k, EMPTY_SLOT);
        self.stats.fill(PixelStats::default());
        self.valid.fill(self.opts.initial_value);
        self.filtered.fill_split(&self.roi, self.opts.initial_value, 0.0);
        self.slot_index = 0;
        self.init_frames = 0;
        self.stabilized = false;
        debug!(
            "TemporalFilter::reset roi={} slots={} floor={}",
            self.roi, k, self.opts.valid_floor
        );
    }

    pub fn set_roi(&mut self, roi: Roi) {
        self.roi = roi.clamp_to(self.res);
        info!("TemporalFilter: ROI set to {}", self.roi);
        self.reset();
    }

    pub fn set_averaging_slots(&mut self, slots: usize) {
        self.opts = self.opts.with_averaging_slots(slots);
        self.reset();
    }

    pub fn set_follow_big_change(&mut self, follow: bool) {
        self.opts.follow_big_change = follow;
        self.reset();
    }

    /// Takes effect on the next cycle; buffers are kept.
    pub fn set_valid_floor(&mut self, floor: f32) {
        self.opts.valid_floor = floor;
    }

    pub fn set_max_variance(&mut self, max_variance: f32) {
        self.opts.max_variance = max_variance;
    }

    pub fn set_hysteresis(&mut self, hysteresis: f32) {
        self.opts.hysteresis = hysteresis;
    }

    /// Run one filter cycle over the ROI.
    ///
    /// A frame of the wrong size counts as a dropped frame: nothing changes.
    pub fn update(&mut self, raw: ImageU16<'_>) -> TemporalCycle {
        if !raw.matches(self.res) {
            warn!(
                "TemporalFilter: dropping {}x{} frame, expected {}",
                raw.width(),
                raw.height(),
                self.res
            );
            return TemporalCycle::default();
        }

        let w = self.res.width;
        let k = self.opts.averaging_slots;
        let ctx = RowContext {
            x0: self.roi.x0,
            x1: self.roi.x1,
            k,
            slot: self.slot_index,
            min_samples: self.opts.min_samples(),
            opts: self.opts,
        };
        let (y0, rows) = (self.roi.y0, self.roi.height());

        let cycle = if w == 0 || rows == 0 {
            TemporalCycle::default()
        } else {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                self.slots
                    .par_chunks_mut(w * k)
                    .zip(self.stats.par_chunks_mut(w))
                    .zip(self.valid.par_chunks_mut(w))
                    .zip(self.filtered.data.par_chunks_mut(w))
                    .enumerate()
                    .skip(y0)
                    .take(rows)
                    .map(|(y, (((slots, stats), valid), filtered))| {
                        filter_row(&ctx, raw.row(y), slots, stats, valid, filtered)
                    })
                    .reduce(TemporalCycle::default, TemporalCycle::merge)
            }
            #[cfg(not(feature = "parallel"))]
            {
                self.slots
                    .chunks_mut(w * k)
                    .zip(self.stats.chunks_mut(w))
                    .zip(self.valid.chunks_mut(w))
                    .zip(self.filtered.data.chunks_mut(w))
                    .enumerate()
                    .skip(y0)
                    .take(rows)
                    .map(|(y, (((slots, stats), valid), filtered))| {
                        filter_row(&ctx, raw.row(y), slots, stats, valid, filtered)
                    })
                    .fold(TemporalCycle::default(), TemporalCycle::merge)
            }
        };

        self.slot_index = (self.slot_index + 1) % k;
        self.init_frames += 1;
        if !self.stabilized && self.init_frames > self.opts.min_init_frames {
            self.stabilized = true;
            info!(
                "TemporalFilter: surface stabilized after {} cycles",
                self.init_frames
            );
        }

        TemporalCycle {
            processed: true,
            ..cycle
        }
    }

    #[inline]
    pub fn filtered(&self) -> &ImageF32 {
        &self.filtered
    }

    /// Mutable access for in-place post passes (spatial smoothing).
    #[inline]
    pub fn filtered_mut(&mut self) -> &mut ImageF32 {
        &mut self.filtered
    }

    #[inline]
    pub fn is_stabilized(&self) -> bool {
        self.stabilized
    }

    #[inline]
    pub fn cycles_since_reset(&self) -> usize {
        self.init_frames
    }

    #[inline]
    pub fn roi(&self) -> Roi {
        self.roi
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    #[inline]
    pub fn options(&self) -> &TemporalOptions {
        &self.opts
    }

    pub fn pixel_stats(&self, x: usize, y: usize) -> PixelStats {
        self.stats[y * self.res.width + x]
    }

    /// Whether pixel `(x, y)` currently passes the stability test.
    pub fn is_pixel_stable(&self, x: usize, y: usize) -> bool {
        self.pixel_stats(x, y)
            .is_stable(self.opts.min_samples(), self.opts.max_variance)
    }

    /// Ring of pixel `(x, y)`; empty slots are NaN.
    pub fn slot_values(&self, x: usize, y: usize) -> &[f32] {
        let k = self.opts.averaging_slots;
        let p = y * self.res.width + x;
        &self.slots[p * k..(p + 1) * k]
    }
}

fn filter_row(
    ctx: &RowContext,
    raw: &[u16],
    slots: &mut [f32],
    stats: &mut [PixelStats],
    valid: &mut [f32],
    filtered: &mut [f32],
) -> TemporalCycle {
    let opts = &ctx.opts;
    let mut cycle = TemporalCycle::default();
    for x in ctx.x0..ctx.x1 {
        let v = raw[x] as f32;
        let st = &mut stats[x];
        if v > opts.valid_floor {
            cycle.accepted_samples += 1;
            let ring = &mut slots[x * ctx.k..(x + 1) * ctx.k];
            // Judged against the history before `v` joins it.
            let jumped = opts.follow_big_change
                && st
                    .mean()
                    .is_some_and(|mean| (mean - v as f64).abs() > opts.big_change as f64);
            if jumped {
                ring.fill(v);
                *st = PixelStats::repeated(v, ctx.k);
                cycle.big_changes += 1;
            } else {
                let old = ring[ctx.slot];
                ring[ctx.slot] = v;
                st.add(v);
                if !old.is_nan() {
                    st.remove(old);
                }
            }
        }

        if st.is_stable(ctx.min_samples, opts.max_variance) {
            cycle.stable_pixels += 1;
            let mean = (st.sum / st.count as f64) as f32;
            if (mean - valid[x]).abs() >= opts.hysteresis {
                valid[x] = mean;
            }
        }
        filtered[x] = valid[x];
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_pixel(opts: TemporalOptions) -> TemporalFilter {
        let res = Resolution::new(1, 1);
        TemporalFilter::new(res, Roi::full(res), opts)
    }

    fn feed(filter: &mut TemporalFilter, v: u16) -> TemporalCycle {
        let data = [v];
        filter.update(ImageU16::new(1, 1, &data).unwrap())
    }

    #[test]
    fn ring_overwrites_one_slot_per_cycle() {
        let opts = TemporalOptions::default().with_averaging_slots(3);
        let mut f = single_pixel(opts);
        for v in [1000u16, 1001, 1002, 1003] {
            feed(&mut f, v);
        }
        assert_eq!(f.slot_values(0, 0), &[1003.0, 1001.0, 1002.0]);
        let st = f.pixel_stats(0, 0);
        assert_eq!(st.count, 3);
        assert_eq!(st.sum, 3006.0);
        assert_eq!(st.sum_sq, 1003.0 * 1003.0 + 1001.0 * 1001.0 + 1002.0 * 1002.0);
    }

    #[test]
    fn samples_at_floor_are_ignored() {
        let mut f = single_pixel(TemporalOptions::default());
        let cycle = feed(&mut f, 570);
        assert!(cycle.processed);
        assert_eq!(cycle.accepted_samples, 0);
        assert_eq!(f.pixel_stats(0, 0), PixelStats::default());
        assert_eq!(f.filtered().get(0, 0), 4000.0);
    }

    #[test]
    fn noisy_pixel_never_stabilizes() {
        let mut f = single_pixel(TemporalOptions::default());
        for i in 0..30 {
            let c = feed(&mut f, if i % 2 == 0 { 990 } else { 1010 });
            assert_eq!(c.stable_pixels, 0);
        }
        assert_eq!(f.filtered().get(0, 0), 4000.0);
    }

    #[test]
    fn big_change_resets_whole_ring() {
        let opts = TemporalOptions::default()
            .with_averaging_slots(5)
            .with_big_change(true, 10.0);
        let mut f = single_pixel(opts);
        for _ in 0..5 {
            feed(&mut f, 1000);
        }
        let c = feed(&mut f, 900);
        assert_eq!(c.big_changes, 1);
        assert_eq!(f.slot_values(0, 0), &[900.0; 5]);
        assert_eq!(f.pixel_stats(0, 0), PixelStats::repeated(900.0, 5));
        assert_eq!(f.filtered().get(0, 0), 900.0);
    }

    fn settled(k: usize, samples: usize, v: u16) -> TemporalFilter {
        let opts = TemporalOptions::default()
            .with_averaging_slots(k)
            .with_big_change(true, 10.0);
        let mut f = single_pixel(opts);
        for _ in 0..samples {
            feed(&mut f, v);
        }
        f
    }

    #[test]
    fn big_change_threshold_on_full_ring() {
        let mut f = settled(5, 5, 1000);
        let c = feed(&mut f, 989);
        assert_eq!(c.big_changes, 1);
        assert_eq!(f.slot_values(0, 0), &[989.0; 5]);

        let mut f = settled(5, 5, 1000);
        let c = feed(&mut f, 991);
        assert_eq!(c.big_changes, 0);
        assert_eq!(f.slot_values(0, 0), &[991.0, 1000.0, 1000.0, 1000.0, 1000.0]);
    }

    #[test]
    fn big_change_threshold_after_one_sample() {
        let mut f = settled(15, 1, 1000);
        let c = feed(&mut f, 985);
        assert_eq!(c.big_changes, 1);
        assert_eq!(f.pixel_stats(0, 0), PixelStats::repeated(985.0, 15));

        let mut f = settled(15, 1, 1000);
        let c = feed(&mut f, 1009);
        assert_eq!(c.big_changes, 0);
        let st = f.pixel_stats(0, 0);
        assert_eq!(st.count, 2);
        assert_eq!(st.sum, 2009.0);
    }

    #[test]
    fn jump_of_exactly_big_change_does_not_fire() {
        for v in [990u16, 1010] {
            let mut f = settled(5, 5, 1000);
            let c = feed(&mut f, v);
            assert_eq!(c.big_changes, 0, "sample {v}");
            assert_eq!(f.pixel_stats(0, 0).count, 5);
        }
    }

    #[test]
    fn empty_history_never_counts_as_big_change() {
        let mut f = settled(5, 0, 1000);
        let c = feed(&mut f, 1000);
        assert_eq!(c.big_changes, 0);
        assert_eq!(f.pixel_stats(0, 0).count, 1);
    }

    #[test]
    fn mismatched_frame_is_dropped() {
        let mut f = single_pixel(TemporalOptions::default());
        let data = [1000u16; 4];
        let c = f.update(ImageU16::new(2, 2, &data).unwrap());
        assert!(!c.processed);
        assert_eq!(f.cycles_since_reset(), 0);
    }

    #[test]
    fn stabilized_after_min_init_frames() {
        let mut f = single_pixel(TemporalOptions::default().with_min_init_frames(3));
        for _ in 0..3 {
            feed(&mut f, 1000);
            assert!(!f.is_stabilized());
        }
        feed(&mut f, 1000);
        assert!(f.is_stabilized());
        f.set_averaging_slots(7);
        assert!(!f.is_stabilized());
        assert_eq!(f.slot_values(0, 0).len(), 7);
    }
}
