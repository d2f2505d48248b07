//! Persisted surface settings.
//!
//! One JSON document holds the last known ROI, base plane, valid floor and
//! filter switches so a restart resumes without recalibrating. Missing
//! fields take their defaults.
use crate::calibration::{BasePlane, CalibrationOutcome};
use crate::error::SurfaceError;
use crate::geometry::PlaneEquation;
use crate::image::io::{read_json_file, write_json_file};
use crate::pipeline::SurfaceParams;
use crate::types::Roi;
use crate::worker::FilterAction;
use log::info;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    pub roi: Option<Roi>,
    pub base_plane: BasePlane,
    /// Equation derived from `base_plane` when the settings were written.
    pub base_plane_eq: PlaneEquation,
    /// Lowest accepted raw depth.
    pub max_offset: f32,
    pub spatial_filtering: bool,
    pub follow_big_changes: bool,
    pub averaging_slots: usize,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        let base_plane = BasePlane::default();
        Self {
            roi: None,
            base_plane_eq: base_plane.equation().unwrap_or(PlaneEquation {
                normal: Vector3::z(),
                offset: -base_plane.point.z,
            }),
            base_plane,
            max_offset: 570.0,
            spatial_filtering: true,
            follow_big_changes: false,
            averaging_slots: 15,
        }
    }
}

impl SurfaceSettings {
    pub fn load(path: &Path) -> Result<Self, SurfaceError> {
        let settings: Self = read_json_file(path)?;
        info!("SurfaceSettings: loaded {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SurfaceError> {
        write_json_file(path, self)
    }

    /// Replace the base plane, keeping the stored equation in sync.
    pub fn set_base_plane(&mut self, base_plane: BasePlane) {
        self.base_plane = base_plane;
        if let Some(eq) = base_plane.equation() {
            self.base_plane_eq = eq;
        }
    }

    /// Take over what a calibration session measured.
    pub fn apply_outcome(&mut self, outcome: &CalibrationOutcome) {
        self.roi = Some(outcome.roi);
        self.max_offset = outcome.max_offset as f32;
        self.set_base_plane(outcome.base_plane);
    }

    /// Pipeline parameters with the stored switches applied to `base`.
    pub fn surface_params(&self, base: SurfaceParams) -> SurfaceParams {
        let mut params = base;
        params.temporal = params
            .temporal
            .with_averaging_slots(self.averaging_slots)
            .with_valid_floor(self.max_offset);
        params.temporal.follow_big_change = self.follow_big_changes;
        params.smoothing.enabled = self.spatial_filtering;
        params
    }

    /// Actions bringing a running producer in line with these settings.
    pub fn filter_actions(&self) -> Vec<FilterAction> {
        let mut actions = Vec::with_capacity(5);
        if let Some(roi) = self.roi {
            actions.push(FilterAction::SetRoi(roi));
        }
        actions.extend([
            FilterAction::SetAveragingSlots(self.averaging_slots),
            FilterAction::SetFollowBigChange(self.follow_big_changes),
            FilterAction::SetSpatialFiltering(self.spatial_filtering),
            FilterAction::SetValidFloor(self.max_offset),
        ]);
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let s: SurfaceSettings =
            serde_json::from_str(r#"{ "max_offset": 640.0, "roi": { "x0": 1, "y0": 2, "x1": 30, "y1": 40 } }"#)
                .unwrap();
        assert_eq!(s.max_offset, 640.0);
        assert_eq!(s.roi, Some(Roi::new(1, 2, 30, 40)));
        assert_eq!(s.averaging_slots, 15);
        assert!(s.spatial_filtering);
        assert_eq!(s.base_plane, BasePlane::default());
    }

    #[test]
    fn params_follow_stored_switches() {
        let s = SurfaceSettings {
            spatial_filtering: false,
            follow_big_changes: true,
            averaging_slots: 9,
            max_offset: 700.0,
            ..SurfaceSettings::default()
        };
        let p = s.surface_params(SurfaceParams::default());
        assert!(!p.smoothing.enabled);
        assert!(p.temporal.follow_big_change);
        assert_eq!(p.temporal.averaging_slots, 9);
        assert_eq!(p.temporal.valid_floor, 700.0);
        // No ROI stored: the running ROI is left alone.
        assert_eq!(s.filter_actions().len(), 4);
    }
}
