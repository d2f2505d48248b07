//! Parameter set of the per-cycle surface pipeline.
//!
//! Groups the temporal filter, smoothing, gradient and preview options so one
//! JSON document (or one `Default`) configures the whole producer side.
use crate::filter::{SmoothingOptions, TemporalOptions};
use crate::gradient::GradientOptions;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceParams {
    /// Per-pixel temporal stability filter.
    pub temporal: TemporalOptions,
    /// Separable smoothing applied after the temporal filter.
    pub smoothing: SmoothingOptions,
    /// Coarse gradient field.
    pub gradient: GradientOptions,
    /// Grayscale depth view published next to the filtered frame.
    pub preview: DepthPreviewOptions,
}

/// Depth range of the grayscale view: `near` renders white, `far` black.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthPreviewOptions {
    pub near: f32,
    pub far: f32,
}

impl Default for DepthPreviewOptions {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: 5000.0,
        }
    }
}
