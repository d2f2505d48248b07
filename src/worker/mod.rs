//! Producer thread, action queue and single-slot handoffs.
pub mod actions;
pub mod handoff;
pub mod surface_worker;

pub use actions::{ActionQueue, FilterAction, FilterControl};
pub use handoff::{Handoff, Published};
pub use surface_worker::SurfaceWorker;
