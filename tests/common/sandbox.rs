//! Simulated sandbox rig: a walled box seen by a depth sensor and a display
//! with a known world → display map, plus a camera that "sees" the board the
//! display currently shows.
use super::synthetic_depth::walled_box;
use nalgebra::Vector2;
use sand_surface::calibration::{BoardLayout, BoardPattern, CornerDetector};
use sand_surface::geometry::{CoordinateTransform, PlaneEquation, ProjectiveCalibration, SensorModel};
use sand_surface::image::{ColorFrame, ImageF32, RawDepthFrame};
use sand_surface::types::{Resolution, Roi};
use std::cell::Cell;
use std::rc::Rc;

pub const SENSOR: Resolution = Resolution::new(160, 120);
pub const DISPLAY: Resolution = Resolution::new(1280, 800);
pub const INTERIOR: Roi = Roi::new(12, 10, 148, 110);
pub const FLOOR: u16 = 1000;
pub const BOARD: u16 = 900;
pub const WALL: u16 = 700;

pub fn sensor_model() -> SensorModel {
    SensorModel::from_intrinsics(142.6, 142.6, 80.0, 60.0)
}

/// World → display map of the simulated display.
pub fn truth() -> ProjectiveCalibration {
    ProjectiveCalibration::from_coefficients([
        2.6, 0.05, 0.64, 640.0, -0.04, 2.2, 0.4, 400.0, 2e-5, -1e-5, 1e-3,
    ])
}

/// Depth frame of the box with the sand (or board) surface at `level`.
pub fn scene(level: u16) -> RawDepthFrame {
    walled_box(SENSOR, INTERIOR, level, WALL)
}

/// Same scene as an already filtered frame.
pub fn filtered_scene(level: u16) -> ImageF32 {
    let raw = scene(level);
    let data = raw.as_view().data.iter().map(|&d| d as f32).collect();
    ImageF32::from_vec(SENSOR.width, SENSOR.height, data).unwrap()
}

pub fn color_frame() -> ColorFrame {
    ColorFrame::new(SENSOR.width, SENSOR.height, vec![255; SENSOR.pixel_count() * 3]).unwrap()
}

/// Shared state between the test loop and the simulated camera.
#[derive(Clone, Default)]
pub struct Stage {
    pub displayed: Rc<Cell<Option<BoardPattern>>>,
    pub surface_depth: Rc<Cell<f64>>,
}

/// Reports where the displayed board's inner corners land on the sensor,
/// or nothing when no board is shown or a corner falls outside the box.
pub struct SimulatedCamera {
    stage: Stage,
    transform: CoordinateTransform,
}

impl SimulatedCamera {
    pub fn new(stage: Stage) -> Self {
        let plane = PlaneEquation::from_point_normal(
            &nalgebra::Vector3::new(0.0, 0.0, FLOOR as f64),
            &nalgebra::Vector3::z(),
        )
        .unwrap();
        Self {
            stage,
            transform: CoordinateTransform::new(sensor_model(), plane).with_calibration(truth()),
        }
    }
}

impl CornerDetector for SimulatedCamera {
    fn detect(&mut self, _color: &ColorFrame, layout: &BoardLayout) -> Option<Vec<Vector2<f64>>> {
        let board = self.stage.displayed.get()?;
        if board.layout != *layout {
            return None;
        }
        let z = self.stage.surface_depth.get();
        board
            .inner_corners()
            .iter()
            .map(|c| {
                let s = self.transform.display_to_sensor(c.x, c.y, z)?;
                (s.x >= 0.0 && s.y >= 0.0 && INTERIOR.contains(s.x as usize, s.y as usize))
                    .then_some(s)
            })
            .collect()
    }
}
