//! Persisted settings and tool configuration.
pub mod demo;
pub mod settings;

pub use settings::SurfaceSettings;
