//! Terminal reports: run summaries, quality tables, the method registry.

pub mod format;

pub use format::*;
