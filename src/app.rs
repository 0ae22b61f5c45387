//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main that:
//! - initialises logging
//! - parses CLI arguments into typed configs
//! - runs the pipeline for the chosen subcommand
//! - prints reports and writes outputs

use std::io::{self, Write};
use std::path::Path;

use clap::Parser;
use log::info;

use crate::cli::{Command, GenerateArgs, InterpolateArgs, QualityArgs, SmoothArgs};
use crate::data::GrowthModel;
use crate::domain::{CurveColumns, Table};
use crate::error::{FermError, Result};
use crate::methods::{InterpMethod, Params, SmoothMethod};
use crate::pipeline::linspace;

pub mod pipeline;

use pipeline::{GenerateConfig, InterpolateConfig, QualityConfig, SmoothConfig};

/// Entry point for the `ferm` binary.
pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Smooth(args) => handle_smooth(&smooth_config_from_args(&args)?),
        Command::Interpolate(args) => handle_interpolate(&interpolate_config_from_args(&args)?),
        Command::Quality(args) => handle_quality(&quality_config_from_args(&args)),
        Command::Generate(args) => handle_generate(&generate_config_from_args(&args)?),
        Command::Methods(args) => {
            if args.json {
                println!("{}", crate::report::format_registry_json()?);
            } else {
                print!("{}", crate::report::format_registry());
            }
            Ok(())
        }
    }
}

fn handle_smooth(config: &SmoothConfig) -> Result<()> {
    let out = pipeline::run_smooth(config)?;
    let summary = crate::report::format_run_summary(&out.summary);
    let quality = out.quality.as_ref().map(crate::report::format_quality_report);

    match &config.output {
        Some(path) => {
            write_output(Some(path.as_path()), &out.table)?;
            println!("{summary}");
            if let Some(text) = quality {
                println!("{text}");
            }
        }
        None => {
            // stdout carries the table; keep the reports off it
            write_output(None, &out.table)?;
            eprintln!("{summary}");
            if let Some(text) = quality {
                eprintln!("{text}");
            }
        }
    }
    Ok(())
}

fn handle_interpolate(config: &InterpolateConfig) -> Result<()> {
    let out = pipeline::run_interpolate(config)?;
    write_output(config.output.as_deref(), &out.table)?;
    if config.output.is_some() {
        println!("{}", crate::report::format_run_summary(&out.summary));
    }
    Ok(())
}

fn handle_quality(config: &QualityConfig) -> Result<()> {
    let report = pipeline::run_quality(config)?;
    println!("{}", crate::report::format_quality_report(&report));
    if let Some(path) = &config.json {
        crate::io::write_quality_json(path, &report)?;
        info!("wrote quality report to {}", path.display());
    }
    Ok(())
}

fn handle_generate(config: &GenerateConfig) -> Result<()> {
    let table = pipeline::run_generate(config)?;
    write_output(config.output.as_deref(), &table)
}

fn write_output(path: Option<&Path>, table: &Table) -> Result<()> {
    match path {
        Some(path) => {
            crate::io::write_table_csv(path, table)?;
            info!("wrote {} rows to {}", table.n_rows(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            crate::io::write_table(&mut lock, table)?;
            lock.flush()?;
        }
    }
    Ok(())
}

fn curve_columns(x: &str, y: &str, group: Option<&str>) -> CurveColumns {
    let columns = CurveColumns::new(x, y);
    match group {
        Some(group) => columns.grouped_by(group),
        None => columns,
    }
}

pub fn smooth_config_from_args(args: &SmoothArgs) -> Result<SmoothConfig> {
    let mut stages = Vec::with_capacity(1 + args.stages.len());
    if let Some(name) = &args.method {
        stages.push(SmoothMethod::resolve(name, &Params::from_pairs(&args.params)?)?);
    } else if !args.params.is_empty() {
        return Err(FermError::invalid_parameter("--param needs --method"));
    }
    for stage in &args.stages {
        stages.push(SmoothMethod::parse_stage(stage)?);
    }
    if stages.is_empty() {
        return Err(FermError::invalid_parameter("give a smoothing method with --method or --stage"));
    }

    Ok(SmoothConfig {
        input: args.curve.input.clone(),
        columns: curve_columns(&args.curve.x, &args.curve.y, args.curve.group.as_deref()),
        stages,
        suffix: args.suffix.clone(),
        skip_failed: args.skip_failed,
        quality: args.quality,
        output: args.output.clone(),
    })
}

pub fn interpolate_config_from_args(args: &InterpolateArgs) -> Result<InterpolateConfig> {
    Ok(InterpolateConfig {
        input: args.curve.input.clone(),
        columns: curve_columns(&args.curve.x, &args.curve.y, args.curve.group.as_deref()),
        grid: linspace(args.grid.start, args.grid.stop, args.grid.count),
        method: InterpMethod::resolve(&args.method, &Params::from_pairs(&args.params)?)?,
        output: args.output.clone(),
    })
}

pub fn quality_config_from_args(args: &QualityArgs) -> QualityConfig {
    QualityConfig {
        input: args.input.clone(),
        x: args.x.clone(),
        original: args.original.clone(),
        smoothed: args.smoothed.clone(),
        group: args.group.clone(),
        json: args.json.clone(),
    }
}

pub fn generate_config_from_args(args: &GenerateArgs) -> Result<GenerateConfig> {
    if !(args.t_max.is_finite() && args.t_max > 0.0) {
        return Err(FermError::invalid_parameter(format!("--t-max must be > 0, got {}", args.t_max)));
    }
    Ok(GenerateConfig {
        model: GrowthModel::from_name(&args.model)?,
        time: linspace(0.0, args.t_max, args.points),
        samples: args.samples,
        noise_std: args.noise_std,
        seed: args.seed,
        output: args.output.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn smooth_args(argv: &[&str]) -> SmoothArgs {
        let mut full = vec!["ferm", "smooth", "-i", "in.csv", "--y", "ph"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Smooth(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn method_and_stages_become_an_ordered_stage_list() {
        let config = smooth_config_from_args(&smooth_args(&[
            "-m", "rolling", "-p", "window=3", "--stage", "ema:span=4",
        ]))
        .unwrap();
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.stages[0].name(), "rolling");
        assert_eq!(config.stages[1].name(), "ema");
        assert!(config.columns.group.is_none());
    }

    #[test]
    fn smoothing_needs_at_least_one_stage() {
        assert!(smooth_config_from_args(&smooth_args(&[])).is_err());
        assert!(smooth_config_from_args(&smooth_args(&["-p", "window=3"])).is_err());
    }

    #[test]
    fn unknown_method_fails_before_reading_input() {
        let err = smooth_config_from_args(&smooth_args(&["-m", "lowess"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
