//! CSV ingest into a [`Table`].
//!
//! - the header row names the columns (a UTF-8 BOM on the first name is stripped)
//! - a column is numeric when every non-empty cell parses as `f64`; empty
//!   cells become NaN
//! - any other column is kept as text
//!
//! Rows whose field count differs from the header are skipped and reported,
//! never padded.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, warn};

use crate::domain::{Column, Table};
use crate::error::Result;

/// A row that could not be used.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the table plus what was skipped on the way.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: Table,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read a CSV file from disk.
pub fn read_table_csv(path: &Path) -> Result<IngestedTable> {
    let file = File::open(path)?;
    let ingested = read_table(file)?;
    debug!(
        "ingest: {} rows x {} columns from {}",
        ingested.table.n_rows(),
        ingested.table.n_cols(),
        path.display()
    );
    Ok(ingested)
}

/// Read CSV from any reader.
pub fn read_table<R: Read>(input: R) -> Result<IngestedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let names: Vec<String> = reader.headers()?.iter().map(normalize_header_name).collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        if record.len() != names.len() {
            row_errors.push(RowError {
                line,
                message: format!("expected {} fields, found {}", names.len(), record.len()),
            });
            continue;
        }
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    for err in &row_errors {
        warn!("skipping CSV line {}: {}", err.line, err.message);
    }

    let columns = names.into_iter().zip(cells.into_iter().map(infer_column)).collect();
    Ok(IngestedTable {
        table: Table::from_columns(columns)?,
        row_errors,
        rows_read,
    })
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn infer_column(cells: Vec<String>) -> Column {
    let parsed: Option<Vec<f64>> = cells
        .iter()
        .map(|c| if c.is_empty() { Some(f64::NAN) } else { c.parse().ok() })
        .collect();
    match parsed {
        Some(values) => Column::Numeric(values),
        None => Column::Text(cells),
    }
}
