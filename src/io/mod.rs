//! Input/output helpers.
//!
//! - CSV ingest into a table (`ingest`)
//! - table export to CSV (`export`)
//! - quality report JSON (`report`)

pub mod export;
pub mod ingest;
pub mod report;

pub use export::*;
pub use ingest::*;
pub use report::*;
