//! Persisted world → display calibration.
//!
//! The artifact records the resolutions it was solved for. Restoring it into
//! a setup with a different sensor or display resolution fails closed: the
//! caller stays uncalibrated instead of projecting with a stale map.
use crate::error::SurfaceError;
use crate::geometry::ProjectiveCalibration;
use crate::image::io::{read_json_file, write_json_file};
use crate::types::Resolution;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationArtifact {
    pub coefficients: [f64; 11],
    pub sensor_resolution: Resolution,
    pub display_resolution: Resolution,
}

impl CalibrationArtifact {
    pub fn new(
        calibration: &ProjectiveCalibration,
        sensor_resolution: Resolution,
        display_resolution: Resolution,
    ) -> Self {
        Self {
            coefficients: *calibration.coefficients(),
            sensor_resolution,
            display_resolution,
        }
    }

    pub fn calibration(&self) -> ProjectiveCalibration {
        ProjectiveCalibration::from_coefficients(self.coefficients)
    }

    pub fn save(&self, path: &Path) -> Result<(), SurfaceError> {
        write_json_file(path, self)?;
        info!("CalibrationArtifact: saved {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SurfaceError> {
        read_json_file(path)
    }

    /// Calibration usable with the live resolutions.
    pub fn restore(
        &self,
        live_sensor: Resolution,
        live_display: Resolution,
    ) -> Result<ProjectiveCalibration, SurfaceError> {
        if self.sensor_resolution != live_sensor || self.display_resolution != live_display {
            warn!(
                "CalibrationArtifact: solved for {} / {}, live {} / {}",
                self.sensor_resolution, self.display_resolution, live_sensor, live_display
            );
            return Err(SurfaceError::ResolutionMismatch {
                stored_sensor: self.sensor_resolution,
                stored_display: self.display_resolution,
                live_sensor,
                live_display,
            });
        }
        Ok(self.calibration())
    }

    /// [`load`](Self::load) followed by [`restore`](Self::restore).
    pub fn load_for(
        path: &Path,
        live_sensor: Resolution,
        live_display: Resolution,
    ) -> Result<ProjectiveCalibration, SurfaceError> {
        Self::load(path)?.restore(live_sensor, live_display)
    }
}
