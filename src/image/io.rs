//! I/O helpers for depth previews and JSON.
//!
//! - `depth_to_gray`: map a filtered depth frame to an 8-bit preview.
//! - `save_gray_png`: write an owned 8-bit gray buffer to a PNG.
//! - `write_json_file` / `read_json_file`: pretty JSON on disk.
use super::{GrayFrame, ImageF32, ImageView};
use crate::error::SurfaceError;
use image::{GrayImage, ImageBuffer, Luma};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Map depth to gray so that `near` is white and `far` is black.
///
/// Zero (unprocessed) pixels stay black.
pub fn depth_to_gray(frame: &ImageF32, near: f32, far: f32) -> GrayFrame {
    let span = far - near;
    let mut data = Vec::with_capacity(frame.w * frame.h);
    for y in 0..frame.h {
        let row = frame.row(y);
        data.extend(row.iter().map(|&d| {
            if d <= 0.0 || span.abs() <= f32::EPSILON {
                0
            } else {
                let t = ((far - d) / span).clamp(0.0, 1.0);
                (t * 255.0).round() as u8
            }
        }));
    }
    GrayFrame::new(frame.w, frame.h, data)
}

/// Save an 8-bit grayscale buffer to a PNG.
pub fn save_gray_png(buffer: &GrayFrame, path: &Path) -> Result<(), SurfaceError> {
    ensure_parent_dir(path)?;
    let image: GrayImage = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(
        buffer.width() as u32,
        buffer.height() as u32,
        buffer.data().to_vec(),
    )
    .ok_or(SurfaceError::ImageBuffer {
        width: buffer.width(),
        height: buffer.height(),
    })?;
    image.save(path).map_err(|source| SurfaceError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), SurfaceError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|source| SurfaceError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| SurfaceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and deserialize a JSON document.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, SurfaceError> {
    let text = fs::read_to_string(path).map_err(|source| SurfaceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SurfaceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_parent_dir(path: &Path) -> Result<(), SurfaceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| SurfaceError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}
