//! Run logic behind each subcommand, independent of how results are printed.
//!
//! Each `run_*` takes a typed config (built from CLI args in [`crate::app`]),
//! reads its input, runs the library and returns everything the front-end
//! needs to print or export.

use std::path::PathBuf;

use crate::data::{GrowthModel, generate_curves};
use crate::dispatch;
use crate::domain::{CurveColumns, Table};
use crate::error::Result;
use crate::io::read_table_csv;
use crate::methods::{InterpMethod, SmoothMethod};
use crate::metrics::{QualityReport, evaluate_quality};
use crate::pipeline::{interpolate, smooth_each};
use crate::report::RunSummary;

#[derive(Debug, Clone)]
pub struct SmoothConfig {
    pub input: PathBuf,
    pub columns: CurveColumns,
    pub stages: Vec<SmoothMethod>,
    pub suffix: String,
    pub skip_failed: bool,
    pub quality: bool,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct InterpolateConfig {
    pub input: PathBuf,
    pub columns: CurveColumns,
    pub grid: Vec<f64>,
    pub method: InterpMethod,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct QualityConfig {
    pub input: PathBuf,
    pub x: String,
    pub original: String,
    pub smoothed: String,
    pub group: Option<String>,
    pub json: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub model: GrowthModel,
    pub time: Vec<f64>,
    pub samples: usize,
    pub noise_std: f64,
    pub seed: u64,
    pub output: Option<PathBuf>,
}

/// Outputs of a smoothing or interpolation run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub table: Table,
    pub summary: RunSummary,
    pub quality: Option<QualityReport>,
}

pub fn run_smooth(config: &SmoothConfig) -> Result<RunOutput> {
    let ingested = read_table_csv(&config.input)?;
    let source = &ingested.table;

    let outcomes = smooth_each(source, &config.columns, &config.stages, &config.suffix)?;
    let groups = outcomes.len();
    let skipped: Vec<(String, String)> = outcomes
        .iter()
        .filter_map(|o| match &o.result {
            Err(err) if config.skip_failed => Some((
                o.key.as_ref().map(ToString::to_string).unwrap_or_else(|| "(all)".to_string()),
                err.to_string(),
            )),
            _ => None,
        })
        .collect();
    let table = dispatch::collect(outcomes, config.skip_failed)?;

    let smoothed = format!("{}{}", config.columns.y, config.suffix);
    let quality = if config.quality && table.n_rows() > 0 {
        Some(evaluate_quality(
            &table,
            &config.columns.x,
            &config.columns.y,
            &smoothed,
            config.columns.group.as_deref(),
        )?)
    } else {
        None
    };

    let method = config
        .stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");

    Ok(RunOutput {
        summary: RunSummary {
            title: "smooth",
            input: config.input.display().to_string(),
            method: if method.is_empty() { "(copy)".to_string() } else { method },
            rows_in: source.n_rows(),
            rows_out: table.n_rows(),
            groups,
            skipped,
        },
        table,
        quality,
    })
}

pub fn run_interpolate(config: &InterpolateConfig) -> Result<RunOutput> {
    let ingested = read_table_csv(&config.input)?;
    let source = &ingested.table;
    let table = interpolate(source, &config.columns, &config.grid, &config.method)?;
    let groups = table.n_rows() / config.grid.len().max(1);

    Ok(RunOutput {
        summary: RunSummary {
            title: "interpolate",
            input: config.input.display().to_string(),
            method: format!("{} on {} grid points", config.method.name(), config.grid.len()),
            rows_in: source.n_rows(),
            rows_out: table.n_rows(),
            groups,
            skipped: Vec::new(),
        },
        table,
        quality: None,
    })
}

pub fn run_quality(config: &QualityConfig) -> Result<QualityReport> {
    let ingested = read_table_csv(&config.input)?;
    evaluate_quality(
        &ingested.table,
        &config.x,
        &config.original,
        &config.smoothed,
        config.group.as_deref(),
    )
}

pub fn run_generate(config: &GenerateConfig) -> Result<Table> {
    generate_curves(&config.model, &config.time, config.samples, config.noise_std, config.seed)
}
