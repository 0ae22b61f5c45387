//! JSON output for quality reports.

use std::fs::File;
use std::path::Path;

use crate::error::Result;
use crate::metrics::QualityReport;

/// Write the report as a pretty-printed array of records.
pub fn write_quality_json(path: &Path, report: &QualityReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &report.to_json())?;
    Ok(())
}
