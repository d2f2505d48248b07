//! Coarse slope field sampled from the filtered frame.
pub mod field;
pub mod options;

pub use field::GradientField;
pub use options::GradientOptions;
