//! Command-line parsing for the `ferm` curve smoother.
//!
//! Parsing stays separate from the numeric code: arguments are turned into the
//! typed configs in [`crate::app::pipeline`] before anything runs.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ferm", version, about = "Grouped smoothing and interpolation of fermentation curves")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Smooth a column per sample and append `{y}{suffix}`.
    Smooth(SmoothArgs),
    /// Resample each sample onto a shared grid.
    Interpolate(InterpolateArgs),
    /// Score a smoothed column against the original.
    Quality(QualityArgs),
    /// Write synthetic noisy growth curves.
    Generate(GenerateArgs),
    /// List the available methods and their default parameters.
    Methods(MethodsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct MethodsArgs {
    /// Print the registry as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Input file and the columns that define the curves.
#[derive(Debug, Args, Clone)]
pub struct CurveArgs {
    /// CSV file with a header row.
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    /// x column (e.g. time).
    #[arg(long, default_value = "time")]
    pub x: String,

    /// y column to process.
    #[arg(long)]
    pub y: String,

    /// Column identifying each curve; omit to treat the file as one curve.
    #[arg(short, long)]
    pub group: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SmoothArgs {
    #[command(flatten)]
    pub curve: CurveArgs,

    /// First smoothing stage (rolling, ema, savgol, spline).
    #[arg(short, long)]
    pub method: Option<String>,

    /// Parameter override for `--method`, as key=value. Repeatable.
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Further stages, applied in order, as `name` or `name:key=value,...`.
    #[arg(long = "stage", value_name = "STAGE")]
    pub stages: Vec<String>,

    /// Suffix of the output column.
    #[arg(long, default_value = "_smooth")]
    pub suffix: String,

    /// Leave failing groups out instead of aborting.
    #[arg(long)]
    pub skip_failed: bool,

    /// Also print a quality report for the smoothed column.
    #[arg(long)]
    pub quality: bool,

    /// Write the result here instead of stdout.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct InterpolateArgs {
    #[command(flatten)]
    pub curve: CurveArgs,

    /// Target grid as start:stop:count (inclusive).
    #[arg(long)]
    pub grid: GridSpec,

    /// Interpolation method (linear, spline).
    #[arg(short, long, default_value = "linear")]
    pub method: String,

    /// Parameter override as key=value. Repeatable.
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Write the result here instead of stdout.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct QualityArgs {
    /// CSV file with a header row.
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    /// x column used to order each curve.
    #[arg(long, default_value = "time")]
    pub x: String,

    /// Original (noisy) column.
    #[arg(long)]
    pub original: String,

    /// Smoothed column.
    #[arg(long)]
    pub smoothed: String,

    #[arg(short, long)]
    pub group: Option<String>,

    /// Also write the report as JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Growth model (logistic, gompertz, modified-gompertz).
    #[arg(long, default_value = "logistic")]
    pub model: String,

    /// Number of curves.
    #[arg(short = 'n', long, default_value_t = 3)]
    pub samples: usize,

    /// Points per curve, evenly spaced on [0, t-max].
    #[arg(long, default_value_t = 49)]
    pub points: usize,

    #[arg(long, default_value_t = 24.0)]
    pub t_max: f64,

    /// Standard deviation of the Gaussian measurement noise.
    #[arg(long, default_value_t = 0.05)]
    pub noise_std: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the table here instead of stdout.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Evenly spaced grid written as `start:stop:count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub start: f64,
    pub stop: f64,
    pub count: usize,
}

impl FromStr for GridSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [start, stop, count] = parts.as_slice() else {
            return Err(format!("expected start:stop:count, got `{s}`"));
        };
        let start: f64 = start.parse().map_err(|e| format!("grid start `{start}`: {e}"))?;
        let stop: f64 = stop.parse().map_err(|e| format!("grid stop `{stop}`: {e}"))?;
        let count: usize = count.parse().map_err(|e| format!("grid count `{count}`: {e}"))?;
        if !(start.is_finite() && stop.is_finite()) || count == 0 {
            return Err(format!("grid `{s}` must have finite bounds and a positive count"));
        }
        Ok(GridSpec { start, stop, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_spec_parses_three_fields() {
        assert_eq!(
            "0:10:11".parse::<GridSpec>(),
            Ok(GridSpec { start: 0.0, stop: 10.0, count: 11 })
        );
        assert!("0:10".parse::<GridSpec>().is_err());
        assert!("0:10:0".parse::<GridSpec>().is_err());
        assert!("a:10:3".parse::<GridSpec>().is_err());
    }

    #[test]
    fn smooth_command_collects_repeated_flags() {
        let cli = Cli::parse_from([
            "ferm", "smooth", "-i", "in.csv", "--y", "ph", "-g", "sample_id", "-m", "savgol", "-p",
            "window_length=7", "--stage", "ema:span=3", "--skip-failed",
        ]);
        let Command::Smooth(args) = cli.command else {
            panic!("expected smooth");
        };
        assert_eq!(args.curve.x, "time");
        assert_eq!(args.curve.group.as_deref(), Some("sample_id"));
        assert_eq!(args.params, vec!["window_length=7"]);
        assert_eq!(args.stages, vec!["ema:span=3"]);
        assert!(args.skip_failed);
        assert_eq!(args.suffix, "_smooth");
    }

    #[test]
    fn methods_command_takes_a_json_flag() {
        let Command::Methods(args) = Cli::parse_from(["ferm", "methods", "--json"]).command else {
            panic!("expected methods");
        };
        assert!(args.json);
        let Command::Methods(args) = Cli::parse_from(["ferm", "methods"]).command else {
            panic!("expected methods");
        };
        assert!(!args.json);
    }
}
