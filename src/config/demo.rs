//! Configuration of the `sand-surface-demo` tool.
use crate::geometry::SensorModel;
use crate::pipeline::SurfaceParams;
use crate::types::Resolution;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub width: usize,
    pub height: usize,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fx: 570.3,
            fy: 570.3,
            cx: 320.0,
            cy: 240.0,
        }
    }
}

impl SensorConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn model(&self) -> SensorModel {
        SensorModel::from_intrinsics(self.fx, self.fy, self.cx, self.cy)
    }
}

/// Synthetic sandbox: walls around a rippled sand floor.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Depth of the sand floor.
    pub floor_depth: u16,
    /// Depth of the walls around the box.
    pub wall_depth: u16,
    /// Wall thickness in sensor pixels.
    pub wall_margin: usize,
    /// Peak height of the hill in the middle of the box.
    pub hill_height: f32,
    /// Amplitude of the frame-to-frame flicker.
    pub flicker: u16,
    /// Fraction of pixels without depth in each frame.
    pub dropout: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            floor_depth: 1000,
            wall_depth: 700,
            wall_margin: 40,
            hill_height: 120.0,
            flicker: 2,
            dropout: 0.01,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DemoOutput {
    pub preview_png: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
    pub settings_json: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub sensor: SensorConfig,
    pub display: Resolution,
    /// Frames fed to the producer.
    pub frames: usize,
    /// Frames per second of the synthetic source.
    pub fps: f64,
    pub scene: SceneConfig,
    pub surface: SurfaceParams,
    pub output: DemoOutput,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            display: Resolution::new(1280, 800),
            frames: 150,
            fps: 60.0,
            scene: SceneConfig::default(),
            surface: SurfaceParams::default(),
            output: DemoOutput::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<DemoConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
