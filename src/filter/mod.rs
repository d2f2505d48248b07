//! Depth stabilization: temporal stability filter and spatial smoothing.
pub mod options;
pub mod spatial;
pub mod temporal;

pub use options::{SmoothingOptions, TemporalOptions};
pub use spatial::{SeparableFilter, SpatialSmoother, StaticSeparableFilter, BINOMIAL_3TAP};
pub use temporal::{PixelStats, TemporalCycle, TemporalFilter};
