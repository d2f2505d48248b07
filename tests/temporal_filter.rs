mod common;

use common::synthetic_depth::{flat, NoisySource};
use sand_surface::filter::{TemporalFilter, TemporalOptions};
use sand_surface::image::RawDepthFrame;
use sand_surface::types::{Resolution, Roi};

const RES: Resolution = Resolution::new(8, 6);

fn filter(opts: TemporalOptions) -> TemporalFilter {
    TemporalFilter::new(RES, Roi::full(RES), opts)
}

fn all_equal(f: &TemporalFilter, v: f32) -> bool {
    f.filtered().data.iter().all(|&d| d == v)
}

#[test]
fn constant_input_publishes_after_half_ring() {
    common::init_logging();
    let mut f = filter(TemporalOptions::default());
    let frame = flat(RES, 1000);
    for cycle in 1..=7 {
        let c = f.update(frame.as_view());
        assert_eq!(c.stable_pixels, 0, "cycle {cycle}");
        assert!(all_equal(&f, 4000.0));
    }
    let c = f.update(frame.as_view());
    assert_eq!(c.stable_pixels, RES.pixel_count());
    assert!(all_equal(&f, 1000.0));
    assert!(!f.is_stabilized());
}

#[test]
fn pixel_at_seed_value_turns_stable_on_eighth_cycle() {
    let mut f = filter(TemporalOptions::default());
    let frame = flat(RES, 4000);
    for cycle in 1..=8 {
        f.update(frame.as_view());
        assert_eq!(f.is_pixel_stable(2, 3), cycle == 8, "cycle {cycle}");
        assert!(all_equal(&f, 4000.0));
    }
}

#[test]
fn readiness_follows_init_frames() {
    let mut f = filter(TemporalOptions::default());
    let frame = flat(RES, 1000);
    for _ in 0..60 {
        f.update(frame.as_view());
    }
    assert!(!f.is_stabilized());
    f.update(frame.as_view());
    assert!(f.is_stabilized());

    f.set_roi(Roi::new(2, 1, 6, 5));
    assert!(!f.is_stabilized());
    assert_eq!(f.cycles_since_reset(), 0);
    // Outside the new ROI the frame reads zero.
    assert_eq!(f.filtered().get(0, 0), 0.0);
    assert_eq!(f.filtered().get(3, 2), 4000.0);
}

#[test]
fn visible_value_moves_only_by_hysteresis() {
    let mut f = filter(TemporalOptions::default());
    let mut source = NoisySource::new(RES, 7);
    let mut prev = f.filtered().clone();
    for _ in 0..200 {
        let frame = source.frame(1000, 1);
        f.update(frame.as_view());
        for y in 0..RES.height {
            for x in 0..RES.width {
                let (before, now) = (prev.get(x, y), f.filtered().get(x, y));
                if before != now {
                    assert!((now - before).abs() >= 0.5);
                    let mean = f.pixel_stats(x, y).mean().unwrap() as f32;
                    assert_eq!(now, mean);
                    assert!(f.is_pixel_stable(x, y));
                }
            }
        }
        prev = f.filtered().clone();
    }
    // Noise of ±1 has variance below the threshold: every pixel settled near 1000.
    assert!(f.filtered().data.iter().all(|&d| (d - 1000.0).abs() <= 1.0));
}

#[test]
fn step_change_waits_for_full_ring_without_override() {
    let mut f = filter(TemporalOptions::default());
    for _ in 0..20 {
        f.update(flat(RES, 1000).as_view());
    }
    let lower = flat(RES, 900);
    for _ in 0..14 {
        f.update(lower.as_view());
        assert!(all_equal(&f, 1000.0));
    }
    f.update(lower.as_view());
    assert!(all_equal(&f, 900.0));
}

#[test]
fn big_change_override_jumps_immediately() {
    let opts = TemporalOptions::default().with_big_change(true, 10.0);
    let mut f = filter(opts);
    for _ in 0..20 {
        f.update(flat(RES, 1000).as_view());
    }
    let c = f.update(flat(RES, 900).as_view());
    assert_eq!(c.big_changes, RES.pixel_count());
    assert!(all_equal(&f, 900.0));
    assert_eq!(f.pixel_stats(3, 3).count, 15);
}

#[test]
fn object_placed_during_warm_up_passes_through() {
    let opts = TemporalOptions::default().with_big_change(true, 10.0);
    let mut f = filter(opts);
    f.update(flat(RES, 1000).as_view());
    // 15 away from the single prior sample; the mean after adding it would be
    // only 7.5 away.
    let c = f.update(flat(RES, 985).as_view());
    assert_eq!(c.big_changes, RES.pixel_count());
    assert!(all_equal(&f, 985.0));

    let c = f.update(flat(RES, 980).as_view());
    assert_eq!(c.big_changes, 0);
    assert!(all_equal(&f, 985.0));
}

#[test]
fn sensor_gaps_leave_history_untouched() {
    let mut f = filter(TemporalOptions::default());
    for _ in 0..10 {
        f.update(flat(RES, 1000).as_view());
    }
    let before = f.pixel_stats(4, 2);
    let mut gappy = flat(RES, 1000);
    gappy.data_mut()[2 * RES.width + 4] = 0;
    let c = f.update(gappy.as_view());
    assert_eq!(c.accepted_samples, RES.pixel_count() - 1);
    assert_eq!(f.pixel_stats(4, 2), before);
    assert_eq!(f.filtered().get(4, 2), 1000.0);

    // Every sample at or below the floor: nothing enters the rings.
    let mut g = filter(TemporalOptions::default());
    for _ in 0..30 {
        g.update(flat(RES, 500).as_view());
    }
    assert!(all_equal(&g, 4000.0));
}

#[test]
fn wrong_sized_frame_is_dropped() {
    let mut f = filter(TemporalOptions::default());
    let frame = RawDepthFrame::filled(4, 4, 1000);
    let c = f.update(frame.as_view());
    assert!(!c.processed);
    assert_eq!(f.cycles_since_reset(), 0);
    assert!(all_equal(&f, 4000.0));
}
