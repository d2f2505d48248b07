//! Calibration state machine.
//!
//! A session is polled once per consumer tick with the latest published
//! snapshot. It reconfigures the filter only through [`FilterControl`] and
//! waits for a stabilized snapshot produced after its last action took
//! effect before reading anything from it.
//!
//! Full sequence: detect the sandbox walls on a full frame, fit the base
//! plane, collect board corners at five low targets, wait for the operator to
//! cover the sand with a board, collect five high targets, fit the board plane
//! to derive the valid floor, then solve and refine the ROI. The other
//! [`CalibrationMode`]s run the wall detection alone or skip it.
use super::base_plane::{fit_surface_plane, max_offset_from_plane, BasePlane};
use super::board::{BoardPattern, CornerDetector};
use super::options::CalibrationOptions;
use super::roi::{detect_sandbox_roi, roi_from_calibration};
use super::targets::{TargetLevel, TargetSchedule};
use crate::geometry::{
    solve_projective, CoordinateTransform, Correspondence, ProjectiveCalibration, SensorModel,
    SolveError,
};
use crate::image::{ColorFrame, ImageF32};
use crate::types::{Resolution, Roi};
use crate::worker::{FilterAction, FilterControl, Published};
use log::{debug, info, warn};
use nalgebra::Vector2;
use thiserror::Error;

/// What the consumer sees of the producer for one tick.
#[derive(Clone, Copy, Debug)]
pub struct Observation<'a> {
    pub filtered: &'a ImageF32,
    pub color: Option<&'a ColorFrame>,
    pub stabilized: bool,
    /// Filter actions applied before `filtered` was produced.
    pub epoch: u64,
}

impl<'a> Observation<'a> {
    pub fn from_published(
        filtered: &'a Published<ImageF32>,
        color: Option<&'a Published<ColorFrame>>,
    ) -> Self {
        Self {
            filtered: &filtered.value,
            color: color.map(|c| &c.value),
            stabilized: filtered.stabilized,
            epoch: filtered.epoch,
        }
    }
}

/// Which part of the calibration a session runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CalibrationMode {
    /// Wall detection followed by the display calibration.
    #[default]
    Full,
    /// Wall detection only; ends with the detected ROI applied.
    RoiOnly,
    /// Display calibration inside the ROI given to `Start`. Falls back to
    /// wall detection when that ROI is empty.
    DisplayOnly,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationCommand {
    /// Begin a session; the ROI and valid floor in effect are restored if
    /// the session fails or is cancelled.
    Start {
        mode: CalibrationMode,
        roi: Roi,
        valid_floor: f32,
    },
    /// Operator confirmation (board laid over the sand).
    Advance,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CalibrationFailure {
    #[error("sandbox walls not found in the depth frame")]
    WallsNotFound,
    #[error("sand surface does not determine a base plane")]
    BasePlaneNotFound,
    #[error("board surface does not determine a plane")]
    BoardPlaneNotFound,
    #[error(transparent)]
    Solve(#[from] SolveError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    RoiDetection,
    PlaneAcquisition,
    /// Collecting target `index` of the schedule.
    Points { level: TargetLevel, index: usize },
    /// Waiting for the operator to cover the sand with a board.
    WaitBoard,
    MaxOffset,
    Done,
    Failed(CalibrationFailure),
    Cancelled,
}

impl CalibrationState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CalibrationState::RoiDetection
                | CalibrationState::PlaneAcquisition
                | CalibrationState::Points { .. }
                | CalibrationState::WaitBoard
                | CalibrationState::MaxOffset
        )
    }
}

/// What the display should show this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayRequest {
    /// No session running; regular content.
    Idle,
    /// Uniform bright background.
    Blank,
    Board(BoardPattern),
}

/// Everything a successful session produced.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationOutcome {
    pub calibration: ProjectiveCalibration,
    pub base_plane: BasePlane,
    /// Valid floor requested from the filter.
    pub max_offset: f64,
    /// ROI requested from the filter.
    pub roi: Roi,
    pub pairs: Vec<Correspondence>,
    pub reprojection_rmse: Option<f64>,
}

#[derive(Clone, Copy, Debug)]
struct Restore {
    roi: Roi,
    valid_floor: f32,
}

pub struct CalibrationSession<D: CornerDetector> {
    opts: CalibrationOptions,
    sensor: SensorModel,
    sensor_res: Resolution,
    display_res: Resolution,
    detector: D,
    state: CalibrationState,
    mode: CalibrationMode,
    /// Snapshots with a smaller epoch predate our last action.
    ready_at: u64,
    restore: Option<Restore>,
    roi: Roi,
    base: BasePlane,
    targets: TargetSchedule,
    cleared: bool,
    trials: usize,
    board: Option<BoardPattern>,
    pairs: Vec<Correspondence>,
    message: String,
    outcome: Option<CalibrationOutcome>,
}

impl<D: CornerDetector> CalibrationSession<D> {
    pub fn new(
        detector: D,
        sensor: SensorModel,
        sensor_res: Resolution,
        display_res: Resolution,
        opts: CalibrationOptions,
    ) -> Self {
        Self {
            targets: TargetSchedule::new(display_res, opts.board.size),
            opts,
            sensor,
            sensor_res,
            display_res,
            detector,
            state: CalibrationState::Idle,
            mode: CalibrationMode::Full,
            ready_at: 0,
            restore: None,
            roi: Roi::full(sensor_res),
            base: BasePlane::default(),
            cleared: false,
            trials: 0,
            board: None,
            pairs: Vec::new(),
            message: String::new(),
            outcome: None,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Human readable description of the current step.
    pub fn progress(&self) -> &str {
        &self.message
    }

    pub fn pairs(&self) -> &[Correspondence] {
        &self.pairs
    }

    pub fn options(&self) -> &CalibrationOptions {
        &self.opts
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// Sandbox ROI the session is working in; after `Done` this is the ROI
    /// it requested from the filter.
    pub fn roi(&self) -> Roi {
        self.roi
    }

    pub fn display_request(&self) -> DisplayRequest {
        if !self.state.is_active() {
            return DisplayRequest::Idle;
        }
        match self.board {
            Some(board) => DisplayRequest::Board(board),
            None => DisplayRequest::Blank,
        }
    }

    /// Result of the last successful session, once.
    pub fn take_outcome(&mut self) -> Option<CalibrationOutcome> {
        self.outcome.take()
    }

    pub fn handle<C: FilterControl + ?Sized>(&mut self, cmd: CalibrationCommand, control: &C) {
        match cmd {
            CalibrationCommand::Start {
                mode,
                roi,
                valid_floor,
            } => {
                if self.state.is_active() {
                    warn!("CalibrationSession: start ignored, session already running");
                    return;
                }
                self.begin(mode, Restore { roi, valid_floor }, control);
            }
            CalibrationCommand::Advance => {
                if self.state != CalibrationState::WaitBoard {
                    debug!("CalibrationSession: advance ignored in {:?}", self.state);
                    return;
                }
                // The filter still holds the bare sand; start over on the board.
                self.ready_at = control.perform(FilterAction::ResetBuffers);
                self.enter_target(self.targets.per_level());
            }
            CalibrationCommand::Cancel => {
                if !self.state.is_active() {
                    return;
                }
                self.restore_filter(control);
                self.pairs.clear();
                self.board = None;
                self.roi = Roi::full(self.sensor_res);
                self.set_state(CalibrationState::Cancelled, "Calibration cancelled.");
            }
        }
    }

    /// Advance the session with the latest snapshot.
    pub fn tick<C: FilterControl + ?Sized>(
        &mut self,
        obs: &Observation<'_>,
        control: &C,
    ) -> CalibrationState {
        let ready = obs.stabilized && obs.epoch >= self.ready_at;
        if !ready || obs.filtered.resolution() != self.sensor_res {
            return self.state;
        }
        match self.state {
            CalibrationState::RoiDetection => self.detect_roi(obs, control),
            CalibrationState::PlaneAcquisition => self.acquire_plane(obs, control),
            CalibrationState::Points { index, .. } => self.acquire_target(index, obs),
            CalibrationState::MaxOffset => self.finish(obs, control),
            _ => {}
        }
        self.state
    }

    fn begin<C: FilterControl + ?Sized>(
        &mut self,
        mode: CalibrationMode,
        restore: Restore,
        control: &C,
    ) {
        info!(
            "CalibrationSession: start {:?} (sensor {}, display {})",
            mode, self.sensor_res, self.display_res
        );
        let known_roi = restore.roi.clamp_to(self.sensor_res);
        self.mode = mode;
        self.restore = Some(restore);
        self.pairs.clear();
        self.board = None;
        self.outcome = None;
        self.base = BasePlane::default();
        self.roi = Roi::full(self.sensor_res);
        self.targets = TargetSchedule::new(self.display_res, self.opts.board.size);
        self.ready_at = control.perform(FilterAction::SetRoi(self.roi));

        if mode == CalibrationMode::DisplayOnly && !known_roi.is_empty() {
            self.roi = known_roi;
            self.ready_at = control.perform(FilterAction::SetValidFloor(0.0));
            self.set_state(
                CalibrationState::PlaneAcquisition,
                format!("Flatten the sand. Measuring the base plane inside {known_roi}."),
            );
        } else {
            self.set_state(
                CalibrationState::RoiDetection,
                "Flatten the sand. Enlarging acquisition area and looking for the sandbox walls.",
            );
        }
    }

    fn detect_roi<C: FilterControl + ?Sized>(&mut self, obs: &Observation<'_>, control: &C) {
        let Some(roi) = detect_sandbox_roi(obs.filtered, &self.opts.roi_detection) else {
            self.fail(CalibrationFailure::WallsNotFound, control);
            return;
        };
        self.roi = roi;
        if self.mode == CalibrationMode::RoiOnly {
            control.perform(FilterAction::SetRoi(roi));
            self.restore = None;
            self.set_state(CalibrationState::Done, format!("Sandbox found at {roi}."));
            return;
        }
        self.ready_at = control.perform(FilterAction::SetValidFloor(0.0));
        self.set_state(
            CalibrationState::PlaneAcquisition,
            "Sandbox found. Measuring the base plane.",
        );
    }

    fn acquire_plane<C: FilterControl + ?Sized>(&mut self, obs: &Observation<'_>, control: &C) {
        let base = fit_surface_plane(obs.filtered, &self.roi, self.opts.plane_roi_scale, &self.sensor)
            .and_then(|eq| BasePlane::from_equation(&eq));
        let Some(base) = base else {
            self.fail(CalibrationFailure::BasePlaneNotFound, control);
            return;
        };
        info!(
            "CalibrationSession: base plane normal {:?}, depth {:.1}",
            base.normal.as_slice(),
            base.base_depth()
        );
        self.base = base;
        self.enter_target(0);
    }

    fn acquire_target(&mut self, index: usize, obs: &Observation<'_>) {
        let Some(color) = obs.color else {
            return;
        };
        let layout = self.opts.board;
        let corners = self
            .detector
            .detect(color, &layout)
            .filter(|c| c.len() == layout.corner_count());

        match (corners, self.cleared) {
            (None, false) => {
                // Blank display seen: no stale board can be picked up now.
                self.cleared = true;
                self.board = self.targets.position(index).map(|c| layout.at(c));
            }
            (Some(_), false) => {}
            (Some(corners), true) => match self.pairs_for(&corners, obs.filtered) {
                Some(pairs) => {
                    info!(
                        "CalibrationSession: target {} accepted ({} pairs total)",
                        index + 1,
                        self.pairs.len() + pairs.len()
                    );
                    self.pairs.extend(pairs);
                    self.next_target(index + 1);
                }
                None => self.retry(index, self.opts.shrink_no_depth),
            },
            (None, true) => self.retry(index, self.opts.shrink_not_found),
        }
    }

    /// Pair each detected corner with its display position; `None` unless
    /// every corner has depth in front of the sensor.
    fn pairs_for(&self, corners: &[Vector2<f64>], filtered: &ImageF32) -> Option<Vec<Correspondence>> {
        let board = self.board?;
        corners
            .iter()
            .zip(board.inner_corners())
            .map(|(sensor_px, display)| {
                let depth = filtered.sample(sensor_px.x, sensor_px.y)?;
                if depth <= 0.0 {
                    return None;
                }
                let world = self.sensor.to_world(sensor_px.x, sensor_px.y, depth as f64);
                (world.z > 0.0).then_some(Correspondence::new(world, display))
            })
            .collect()
    }

    fn retry(&mut self, index: usize, shrink: f64) {
        self.trials += 1;
        if self.trials <= self.opts.max_trials {
            return;
        }
        warn!(
            "CalibrationSession: target {} failed {} times, moving it inward",
            index + 1,
            self.trials
        );
        self.targets.shrink(index, shrink);
        self.cleared = false;
        self.trials = 0;
        self.board = None;
    }

    fn next_target(&mut self, index: usize) {
        if index == self.targets.per_level() {
            self.board = None;
            self.set_state(
                CalibrationState::WaitBoard,
                "Cover the sandbox with a flat board, then advance.",
            );
        } else if index >= self.targets.len() {
            self.board = None;
            self.set_state(
                CalibrationState::MaxOffset,
                "Measuring the board plane to set the acquisition ceiling.",
            );
        } else {
            self.enter_target(index);
        }
    }

    fn enter_target(&mut self, index: usize) {
        self.cleared = false;
        self.trials = 0;
        self.board = None;
        let level = self.targets.level(index);
        let msg = format!(
            "Acquiring point {} of {} ({} level).",
            index + 1,
            self.targets.len(),
            match level {
                TargetLevel::Low => "low",
                TargetLevel::High => "high",
            }
        );
        self.set_state(CalibrationState::Points { level, index }, msg);
    }

    fn finish<C: FilterControl + ?Sized>(&mut self, obs: &Observation<'_>, control: &C) {
        let max_offset =
            fit_surface_plane(obs.filtered, &self.roi, self.opts.plane_roi_scale, &self.sensor)
                .and_then(|eq| max_offset_from_plane(&eq, self.opts.safe_range));
        let Some(max_offset) = max_offset else {
            self.fail(CalibrationFailure::BoardPlaneNotFound, control);
            return;
        };
        let calibration = match solve_projective(&self.pairs) {
            Ok(c) => c,
            Err(e) => {
                self.fail(e.into(), control);
                return;
            }
        };

        let roi = match self.base.equation() {
            Some(eq) => {
                let transform = CoordinateTransform::new(self.sensor, eq).with_calibration(calibration);
                roi_from_calibration(&transform, self.display_res, self.base.base_depth(), &self.roi)
            }
            None => None,
        }
        .unwrap_or_else(|| {
            warn!("CalibrationSession: display footprint unusable, keeping {}", self.roi);
            self.roi
        });

        control.perform(FilterAction::SetRoi(roi));
        control.perform(FilterAction::SetValidFloor(max_offset as f32));
        self.restore = None;
        self.roi = roi;

        let reprojection_rmse = calibration.reprojection_rmse(&self.pairs);
        self.outcome = Some(CalibrationOutcome {
            calibration,
            base_plane: self.base,
            max_offset,
            roi,
            pairs: self.pairs.clone(),
            reprojection_rmse,
        });
        let msg = match reprojection_rmse {
            Some(e) => format!("Calibration done ({} pairs, {:.2} px rms).", self.pairs.len(), e),
            None => format!("Calibration done ({} pairs).", self.pairs.len()),
        };
        self.set_state(CalibrationState::Done, msg);
    }

    fn fail<C: FilterControl + ?Sized>(&mut self, reason: CalibrationFailure, control: &C) {
        warn!("CalibrationSession: failed: {reason}");
        self.restore_filter(control);
        self.board = None;
        self.set_state(
            CalibrationState::Failed(reason),
            format!("Calibration failed: {reason}."),
        );
    }

    fn restore_filter<C: FilterControl + ?Sized>(&mut self, control: &C) {
        if let Some(r) = self.restore.take() {
            control.perform(FilterAction::SetRoi(r.roi));
            control.perform(FilterAction::SetValidFloor(r.valid_floor));
        }
    }

    fn set_state(&mut self, state: CalibrationState, message: impl Into<String>) {
        if self.state != state {
            debug!("CalibrationSession: {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.message = message.into();
        info!("CalibrationSession: {}", self.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ActionQueue;

    fn session() -> CalibrationSession<impl CornerDetector> {
        CalibrationSession::new(
            |_: &ColorFrame, _: &crate::calibration::BoardLayout| -> Option<Vec<Vector2<f64>>> { None },
            SensorModel::default(),
            Resolution::new(64, 48),
            Resolution::new(1280, 800),
            CalibrationOptions::default(),
        )
    }

    #[test]
    fn start_requests_full_frame_and_cancel_restores() {
        let queue = ActionQueue::new();
        let mut s = session();
        let roi = Roi::new(5, 5, 50, 40);
        s.handle(
            CalibrationCommand::Start {
                mode: CalibrationMode::Full,
                roi,
                valid_floor: 600.0,
            },
            &queue,
        );
        assert_eq!(s.state(), CalibrationState::RoiDetection);
        assert_eq!(s.display_request(), DisplayRequest::Blank);

        s.handle(CalibrationCommand::Cancel, &queue);
        assert_eq!(s.state(), CalibrationState::Cancelled);
        assert_eq!(s.display_request(), DisplayRequest::Idle);
        let (actions, epoch) = queue.drain();
        assert_eq!(
            actions,
            vec![
                FilterAction::SetRoi(Roi::new(0, 0, 64, 48)),
                FilterAction::SetRoi(roi),
                FilterAction::SetValidFloor(600.0),
            ]
        );
        assert_eq!(epoch, 3);
    }

    #[test]
    fn stale_snapshots_are_ignored() {
        let queue = ActionQueue::new();
        let mut s = session();
        s.handle(
            CalibrationCommand::Start {
                mode: CalibrationMode::Full,
                roi: Roi::new(0, 0, 64, 48),
                valid_floor: 0.0,
            },
            &queue,
        );
        // Stabilized, but produced before the ROI change was applied.
        let frame = ImageF32::new(64, 48);
        let obs = Observation {
            filtered: &frame,
            color: None,
            stabilized: true,
            epoch: 0,
        };
        assert_eq!(s.tick(&obs, &queue), CalibrationState::RoiDetection);
        // Same frame once current: an empty frame has no walls.
        let obs = Observation { epoch: 1, ..obs };
        assert_eq!(
            s.tick(&obs, &queue),
            CalibrationState::Failed(CalibrationFailure::WallsNotFound)
        );
    }

    #[test]
    fn display_only_starts_at_the_base_plane() {
        let queue = ActionQueue::new();
        let mut s = session();
        let roi = Roi::new(8, 6, 56, 42);
        s.handle(
            CalibrationCommand::Start {
                mode: CalibrationMode::DisplayOnly,
                roi,
                valid_floor: 600.0,
            },
            &queue,
        );
        assert_eq!(s.state(), CalibrationState::PlaneAcquisition);
        assert_eq!(s.roi(), roi);
        let (actions, epoch) = queue.drain();
        assert_eq!(
            actions,
            vec![
                FilterAction::SetRoi(Roi::new(0, 0, 64, 48)),
                FilterAction::SetValidFloor(0.0),
            ]
        );
        assert_eq!(epoch, 2);
    }

    #[test]
    fn display_only_without_roi_detects_walls_first() {
        let queue = ActionQueue::new();
        let mut s = session();
        s.handle(
            CalibrationCommand::Start {
                mode: CalibrationMode::DisplayOnly,
                roi: Roi::new(10, 10, 10, 30),
                valid_floor: 600.0,
            },
            &queue,
        );
        assert_eq!(s.state(), CalibrationState::RoiDetection);
        assert_eq!(s.mode(), CalibrationMode::DisplayOnly);
    }

    #[test]
    fn advance_outside_wait_board_is_ignored() {
        let queue = ActionQueue::new();
        let mut s = session();
        s.handle(CalibrationCommand::Advance, &queue);
        assert_eq!(s.state(), CalibrationState::Idle);
        assert_eq!(queue.requested_epoch(), 0);
    }
}
