//! Error type for persistence and image export.
//!
//! Numeric degeneracies never surface here: the geometry layer reports them
//! with `Option`/`SolveError` so callers can poll for a usable result.
use crate::types::Resolution;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize JSON for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to save image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image buffer of {width}x{height} does not match its data length")]
    ImageBuffer { width: usize, height: usize },
    #[error(
        "calibration was solved for sensor {stored_sensor} / display {stored_display}, \
         live setup is sensor {live_sensor} / display {live_display}"
    )]
    ResolutionMismatch {
        stored_sensor: Resolution,
        stored_display: Resolution,
        live_sensor: Resolution,
        live_display: Resolution,
    },
}
