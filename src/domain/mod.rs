//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the column store (`Table`, `Column`)
//! - group identifiers (`GroupKey`)
//! - the column contract of curve operations (`CurveColumns`)

pub mod types;

pub use types::*;
