//! Per-cycle diagnostics reported by the pipeline and the demo tool.
pub mod report;
pub mod timing;

pub use report::CycleReport;
pub use timing::{CycleTimer, StageTiming, TimingBreakdown};
