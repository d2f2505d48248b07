//! Automatic region-of-interest detection.
//!
//! [`detect_sandbox_roi`] finds the box walls in a full-frame depth snapshot:
//! the sand floor is farther from the sensor than the walls around it, so at
//! some depth threshold the pixels beyond it form a region around the frame
//! centre that is enclosed by nearer pixels. The largest such enclosed region
//! over a ladder of thresholds is taken as the sandbox.
//!
//! [`roi_from_calibration`] shrinks an ROI to the part of the sensor frame the
//! display actually covers at base-plane height.
use crate::geometry::CoordinateTransform;
use crate::image::ImageF32;
use crate::types::{Resolution, Roi};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiDetectionOptions {
    /// Number of thresholds between the nearest and farthest depth.
    pub levels: usize,
    /// Smallest enclosed region accepted, in pixels.
    pub min_area: usize,
}

impl Default for RoiDetectionOptions {
    fn default() -> Self {
        Self {
            levels: 128,
            min_area: 12,
        }
    }
}

/// Bounding box of the largest enclosed far region around the frame centre.
///
/// Pixels without depth count as near. Returns `None` when no threshold
/// yields a region that stays clear of the frame border.
pub fn detect_sandbox_roi(frame: &ImageF32, opts: &RoiDetectionOptions) -> Option<Roi> {
    let (w, h) = (frame.w, frame.h);
    if w < 3 || h < 3 {
        return None;
    }
    let (near, far) = frame
        .data
        .iter()
        .filter(|&&d| d > 0.0)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| {
            (lo.min(d), hi.max(d))
        });
    if !(near < far) {
        debug!("detect_sandbox_roi: depth range is empty");
        return None;
    }

    let levels = opts.levels.max(1);
    let mut fill = FloodFill::new(w, h);
    let mut best: Option<(usize, Roi)> = None;
    // Far to near: the first enclosed regions are the deepest parts of the floor.
    for level in 1..levels {
        let threshold = far - (far - near) * level as f32 / levels as f32;
        let Some((area, roi)) = fill.enclosed_from_center(frame, threshold) else {
            continue;
        };
        if area >= opts.min_area && best.map_or(true, |(a, _)| area > a) {
            best = Some((area, roi));
        }
    }
    if let Some((area, roi)) = best {
        info!("detect_sandbox_roi: {} ({} px)", roi, area);
    }
    best.map(|(_, roi)| roi)
}

/// Reusable scratch for the 4-connected fill.
struct FloodFill {
    w: usize,
    h: usize,
    visited: Vec<u32>,
    stamp: u32,
    stack: Vec<usize>,
}

impl FloodFill {
    fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            visited: vec![0; w * h],
            stamp: 0,
            stack: Vec::new(),
        }
    }

    /// Area and bounding box of the region of pixels deeper than `threshold`
    /// connected to the centre; `None` if the centre is not deeper or the
    /// region reaches the border.
    fn enclosed_from_center(&mut self, frame: &ImageF32, threshold: f32) -> Option<(usize, Roi)> {
        let (w, h) = (self.w, self.h);
        let far = |i: usize| frame.data[i] > threshold;
        let start = (h / 2) * w + w / 2;
        if !far(start) {
            return None;
        }
        self.stamp += 1;
        let stamp = self.stamp;
        self.stack.clear();
        self.stack.push(start);
        self.visited[start] = stamp;

        let (mut x0, mut y0, mut x1, mut y1) = (w, h, 0, 0);
        let mut area = 0usize;
        let mut touches_border = false;
        while let Some(i) = self.stack.pop() {
            let (x, y) = (i % w, i / w);
            area += 1;
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
            if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                touches_border = true;
                continue;
            }
            for n in [i - 1, i + 1, i - w, i + w] {
                if self.visited[n] != stamp && far(n) {
                    self.visited[n] = stamp;
                    self.stack.push(n);
                }
            }
        }
        (!touches_border).then(|| (area, Roi::new(x0, y0, x1 + 1, y1 + 1)))
    }
}

/// Part of `roi` covered by the display at the base-plane depth.
///
/// The four display corners are mapped back to sensor pixels; the inner
/// rectangle of the resulting quad (second smallest to second largest
/// coordinate on each axis, so a mirrored mapping works as well) is
/// intersected with `roi`. `None` when the transform is uncalibrated, a
/// corner does not map, or the intersection is empty.
pub fn roi_from_calibration(
    transform: &CoordinateTransform,
    display: Resolution,
    base_depth: f64,
    roi: &Roi,
) -> Option<Roi> {
    let (w, h) = (display.width as f64, display.height as f64);
    let mut xs = [0.0f64; 4];
    let mut ys = [0.0f64; 4];
    for (k, (u, v)) in [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)].into_iter().enumerate() {
        let p = transform.display_to_sensor(u, v, base_depth)?;
        xs[k] = p.x;
        ys[k] = p.y;
    }
    xs.sort_by(f64::total_cmp);
    ys.sort_by(f64::total_cmp);
    let covered = Roi::from_bounds_f64(xs[1], ys[1], xs[2], ys[2])?;
    let refined = covered.intersect(roi);
    debug!("roi_from_calibration: display covers {covered}, refined {refined}");
    (!refined.is_empty()).then_some(refined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PlaneEquation, ProjectiveCalibration, SensorModel};
    use nalgebra::Vector3;

    /// Sand floor at 1000 inside `[10, 50) × [8, 32)`, walls at 700 elsewhere.
    fn sandbox() -> ImageF32 {
        let mut img = ImageF32::new(60, 40);
        img.fill_split(&Roi::new(10, 8, 50, 32), 1000.0, 700.0);
        img
    }

    #[test]
    fn finds_walled_floor() {
        let roi = detect_sandbox_roi(&sandbox(), &RoiDetectionOptions::default()).unwrap();
        assert_eq!(roi, Roi::new(10, 8, 50, 32));
    }

    #[test]
    fn open_floor_has_no_walls() {
        let mut img = sandbox();
        // Breach in the left wall connects the floor to the border.
        for x in 0..10 {
            img.set(x, 20, 1000.0);
        }
        assert!(detect_sandbox_roi(&img, &RoiDetectionOptions::default()).is_none());
        let mut flat = ImageF32::new(60, 40);
        flat.fill(900.0);
        assert!(detect_sandbox_roi(&flat, &RoiDetectionOptions::default()).is_none());
    }

    #[test]
    fn calibration_roi_is_intersected() {
        // Display pixel = 0.5 * sensor pixel at the chosen depth, so the
        // display corners map to the sensor box [0, 2w) × [0, 2h).
        let sensor = SensorModel::default();
        let plane = PlaneEquation::from_point_normal(&Vector3::new(0.0, 0.0, 1000.0), &Vector3::z())
            .unwrap();
        let z = 1000.0;
        // world x = (x/fx - cx/fx) * z  =>  x = world_x * fx / z + cx.
        let k = sensor.scale_x * z;
        let cal = ProjectiveCalibration::from_coefficients([
            0.5 / k,
            0.0,
            -0.5 * (sensor.offset_x / sensor.scale_x) / z,
            0.0,
            0.0,
            0.5 / k,
            -0.5 * (sensor.offset_y / sensor.scale_y) / z,
            0.0,
            0.0,
            0.0,
            0.0,
        ]);
        // Homogeneous row [0 0 0 1] keeps the map affine.
        let t = CoordinateTransform::new(sensor, plane).with_calibration(cal);
        let display = Resolution::new(100, 80);
        let inner = Roi::new(20, 10, 150, 120);
        assert_eq!(roi_from_calibration(&t, display, z, &inner), Some(inner));

        let full = roi_from_calibration(&t, display, z, &Roi::full(Resolution::new(640, 480)))
            .unwrap();
        assert!(full.x0 <= 1 && full.y0 <= 1);
        assert!((199..=200).contains(&full.x1) && (159..=160).contains(&full.y1));

        let outside = Roi::new(300, 300, 400, 400);
        assert!(roi_from_calibration(&t, display, z, &outside).is_none());
    }
}
