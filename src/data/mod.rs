//! Data sources that produce tables for the pipeline.

pub mod synthetic;

pub use synthetic::{GrowthModel, generate_curves};
