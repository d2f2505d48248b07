//! Configuration changes requested by consumers and applied by the producer
//! at the start of its next cycle.
use crate::pipeline::SurfacePipeline;
use crate::types::Roi;
use log::debug;
use parking_lot::Mutex;
use std::mem;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterAction {
    /// New processed region; resets every per-pixel buffer.
    SetRoi(Roi),
    /// New ring depth; resets every per-pixel buffer.
    SetAveragingSlots(usize),
    /// Lowest accepted raw depth.
    SetValidFloor(f32),
    SetSpatialFiltering(bool),
    /// Toggles the big-change override; resets every per-pixel buffer.
    SetFollowBigChange(bool),
    SetGradientResolution(usize),
    ResetBuffers,
}

impl FilterAction {
    pub fn apply(self, pipeline: &mut SurfacePipeline) {
        debug!("applying {self:?}");
        match self {
            FilterAction::SetRoi(roi) => pipeline.set_roi(roi),
            FilterAction::SetAveragingSlots(k) => pipeline.set_averaging_slots(k),
            FilterAction::SetValidFloor(floor) => pipeline.set_valid_floor(floor),
            FilterAction::SetSpatialFiltering(on) => pipeline.set_spatial_filtering(on),
            FilterAction::SetFollowBigChange(on) => pipeline.set_follow_big_change(on),
            FilterAction::SetGradientResolution(r) => pipeline.set_gradient_resolution(r),
            FilterAction::ResetBuffers => pipeline.reset(),
        }
    }
}

/// Anything that accepts filter actions.
///
/// Returns the epoch (count of requested actions) at which the action takes
/// effect: artifacts stamped with an epoch at least this large were produced
/// after it was applied.
pub trait FilterControl {
    fn perform(&self, action: FilterAction) -> u64;
}

#[derive(Default)]
struct Pending {
    actions: Vec<FilterAction>,
    requested: u64,
}

/// Queue of pending actions; the lock is held only to push or drain.
#[derive(Default)]
pub struct ActionQueue {
    pending: Mutex<Pending>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, action: FilterAction) -> u64 {
        let mut pending = self.pending.lock();
        pending.actions.push(action);
        pending.requested += 1;
        pending.requested
    }

    /// Take every pending action together with the epoch reached once they
    /// are applied.
    pub fn drain(&self) -> (Vec<FilterAction>, u64) {
        let mut pending = self.pending.lock();
        (mem::take(&mut pending.actions), pending.requested)
    }

    pub fn requested_epoch(&self) -> u64 {
        self.pending.lock().requested
    }
}

impl FilterControl for ActionQueue {
    fn perform(&self, action: FilterAction) -> u64 {
        self.push(action)
    }
}
