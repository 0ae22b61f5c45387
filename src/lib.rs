//! `ferm-curves` library crate.
//!
//! The binary (`ferm`) is a thin wrapper around this library so that:
//!
//! - the smoothing engine is testable without spawning processes
//! - the pipeline can be embedded in other tools without the CLI
//!
//! Entry points for library users live in [`pipeline`] (smoothing and
//! interpolation) and [`metrics`] (quality scoring).

pub mod app;
pub mod cli;
pub mod data;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod methods;
pub mod metrics;
pub mod pipeline;
pub mod report;
