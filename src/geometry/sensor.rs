use nalgebra::{Matrix4, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Axis-aligned linear sensor model.
///
/// A sensor pixel `(x, y)` with depth `d` maps to the world point
/// `((sx·x + ox)·d, (sy·y + oy)·d, d)`. Lens distortion is assumed to be
/// corrected upstream.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorModel {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for SensorModel {
    /// Pinhole intrinsics of a 640×480 structured-light depth sensor.
    fn default() -> Self {
        Self::from_intrinsics(570.3, 570.3, 320.0, 240.0)
    }
}

impl SensorModel {
    /// Build from focal lengths and principal point (pixels).
    pub fn from_intrinsics(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            scale_x: 1.0 / fx,
            scale_y: 1.0 / fy,
            offset_x: -cx / fx,
            offset_y: -cy / fy,
        }
    }

    /// Homogeneous form `W`; `world = W · [x, y, d, 1] · d`.
    pub fn world_matrix(&self) -> Matrix4<f64> {
        Matrix4::new(
            self.scale_x, 0.0, 0.0, self.offset_x, //
            0.0, self.scale_y, 0.0, self.offset_y, //
            0.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn to_world(&self, x: f64, y: f64, depth: f64) -> Vector3<f64> {
        let w = self.world_matrix() * Vector4::new(x, y, depth, 1.0) * depth;
        Vector3::new(w.x, w.y, w.z)
    }

    /// Inverse of [`to_world`](Self::to_world) for x and y; `None` at zero depth.
    pub fn to_sensor(&self, world: &Vector3<f64>) -> Option<Vector2<f64>> {
        if world.z == 0.0 || !world.z.is_finite() {
            return None;
        }
        Some(Vector2::new(
            (world.x / world.z - self.offset_x) / self.scale_x,
            (world.y / world.z - self.offset_y) / self.scale_y,
        ))
    }
}
