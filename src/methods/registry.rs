//! Method registry: names, defaults and the typed method descriptors.
//!
//! Method names are resolved here once; everything downstream works with the
//! closed [`SmoothMethod`] / [`InterpMethod`] enums and their parameter records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{FermError, Result};
use crate::methods::{
    EmaParams, LinearInterpolant, LinearParams, RollingParams, SavgolParams, SmoothingSpline, SplineParams,
    exponential_moving_average, rolling_average, savitzky_golay,
};

pub const SMOOTHING_METHODS: &[&str] = &["rolling", "ema", "savgol", "spline"];
pub const INTERPOLATION_METHODS: &[&str] = &["linear", "spline"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodRole {
    Smoothing,
    Interpolation,
    Both,
}

impl fmt::Display for MethodRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MethodRole::Smoothing => "smoothing",
            MethodRole::Interpolation => "interpolation",
            MethodRole::Both => "smoothing, interpolation",
        })
    }
}

/// Registry entry: a method name and its parameters with default values.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MethodInfo {
    pub name: &'static str,
    pub role: MethodRole,
    pub summary: &'static str,
    #[serde(serialize_with = "params_as_object")]
    pub params: &'static [(&'static str, &'static str)],
}

fn params_as_object<S: Serializer>(
    params: &&'static [(&'static str, &'static str)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(params.iter().copied())
}

pub static REGISTRY: &[MethodInfo] = &[
    MethodInfo {
        name: "rolling",
        role: MethodRole::Smoothing,
        summary: "moving average over a window of points",
        params: &[("window", "5"), ("center", "true")],
    },
    MethodInfo {
        name: "ema",
        role: MethodRole::Smoothing,
        summary: "exponential moving average, alpha = 2 / (span + 1)",
        params: &[("span", "10")],
    },
    MethodInfo {
        name: "savgol",
        role: MethodRole::Smoothing,
        summary: "Savitzky-Golay local polynomial filter",
        params: &[("window_length", "5"), ("polyorder", "2")],
    },
    MethodInfo {
        name: "linear",
        role: MethodRole::Interpolation,
        summary: "piecewise-linear interpolation",
        params: &[("bounds", "fill"), ("duplicates", "keep-first")],
    },
    MethodInfo {
        name: "spline",
        role: MethodRole::Both,
        summary: "smoothing spline, residual sum of squares <= smoothing_factor",
        params: &[("smoothing_factor", "0"), ("degree", "3"), ("bounds", "extrapolate")],
    },
];

/// Look up a registry entry by name.
pub fn lookup(name: &str) -> Option<&'static MethodInfo> {
    REGISTRY.iter().find(|m| m.name == name)
}

fn unknown(name: &str, valid: &[&str]) -> FermError {
    FermError::UnknownMethod {
        name: name.to_string(),
        valid: valid.iter().map(|s| s.to_string()).collect(),
    }
}

/// Untyped `key=value` overrides, applied on top of a method's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    /// Parse `["window=7", "center=false"]`-style pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Params::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(FermError::invalid_parameter(format!(
                    "expected key=value, got `{pair}`"
                )));
            };
            out.0.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A smoothing method with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothMethod {
    Rolling(RollingParams),
    Ema(EmaParams),
    Savgol(SavgolParams),
    Spline(SplineParams),
}

impl SmoothMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SmoothMethod::Rolling(_) => "rolling",
            SmoothMethod::Ema(_) => "ema",
            SmoothMethod::Savgol(_) => "savgol",
            SmoothMethod::Spline(_) => "spline",
        }
    }

    /// The method with default parameters.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rolling" => Ok(SmoothMethod::Rolling(RollingParams::default())),
            "ema" => Ok(SmoothMethod::Ema(EmaParams::default())),
            "savgol" => Ok(SmoothMethod::Savgol(SavgolParams::default())),
            "spline" => Ok(SmoothMethod::Spline(SplineParams::default())),
            _ => Err(unknown(name, SMOOTHING_METHODS)),
        }
    }

    /// Name plus overrides, validated.
    pub fn resolve(name: &str, params: &Params) -> Result<Self> {
        let mut method = Self::from_name(name)?;
        for (key, value) in params.iter() {
            method.set(key, value)?;
        }
        method.validate()?;
        Ok(method)
    }

    /// Parse a pipeline stage written as `name` or `name:key=value,key=value`.
    pub fn parse_stage(stage: &str) -> Result<Self> {
        let (name, rest) = stage.split_once(':').unwrap_or((stage, ""));
        let pairs = rest.split(',').map(str::trim).filter(|p| !p.is_empty());
        Self::resolve(name, &Params::from_pairs(pairs)?)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match self {
            SmoothMethod::Rolling(p) => p.set(key, value),
            SmoothMethod::Ema(p) => p.set(key, value),
            SmoothMethod::Savgol(p) => p.set(key, value),
            SmoothMethod::Spline(p) => p.set(key, value),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SmoothMethod::Rolling(p) => p.validate(),
            SmoothMethod::Ema(p) => p.validate(),
            SmoothMethod::Savgol(p) => p.validate(),
            SmoothMethod::Spline(p) => p.validate(),
        }
    }

    /// Smooth one curve already sorted by `x`. Output is aligned with `y`.
    pub fn apply(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        if x.len() != y.len() {
            return Err(FermError::length_mismatch(x.len(), y.len()));
        }
        match self {
            SmoothMethod::Rolling(p) => rolling_average(y, p),
            SmoothMethod::Ema(p) => exponential_moving_average(y, p),
            SmoothMethod::Savgol(p) => savitzky_golay(y, p),
            SmoothMethod::Spline(p) => SmoothingSpline::fit(x, y, p)?.evaluate_many(x),
        }
    }
}

impl fmt::Display for SmoothMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothMethod::Rolling(p) => write!(f, "rolling(window={}, center={})", p.window, p.center),
            SmoothMethod::Ema(p) => write!(f, "ema(span={})", p.span),
            SmoothMethod::Savgol(p) => {
                write!(f, "savgol(window_length={}, polyorder={})", p.window_length, p.polyorder)
            }
            SmoothMethod::Spline(p) => {
                write!(f, "spline(smoothing_factor={}, degree={})", p.smoothing_factor, p.degree)
            }
        }
    }
}

/// An interpolation method with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpMethod {
    Linear(LinearParams),
    Spline(SplineParams),
}

impl Default for InterpMethod {
    fn default() -> Self {
        InterpMethod::Linear(LinearParams::default())
    }
}

impl InterpMethod {
    pub fn name(&self) -> &'static str {
        match self {
            InterpMethod::Linear(_) => "linear",
            InterpMethod::Spline(_) => "spline",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(InterpMethod::Linear(LinearParams::default())),
            "spline" => Ok(InterpMethod::Spline(SplineParams::default())),
            _ => Err(unknown(name, INTERPOLATION_METHODS)),
        }
    }

    pub fn resolve(name: &str, params: &Params) -> Result<Self> {
        let mut method = Self::from_name(name)?;
        for (key, value) in params.iter() {
            match &mut method {
                InterpMethod::Linear(p) => p.set(key, value)?,
                InterpMethod::Spline(p) => p.set(key, value)?,
            }
        }
        if let InterpMethod::Spline(p) = &method {
            p.validate()?;
        }
        Ok(method)
    }

    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<Interpolant> {
        match self {
            InterpMethod::Linear(p) => LinearInterpolant::fit(x, y, p).map(Interpolant::Linear),
            InterpMethod::Spline(p) => SmoothingSpline::fit(x, y, p).map(Interpolant::Spline),
        }
    }
}

/// A fitted interpolant of either kind.
#[derive(Debug, Clone)]
pub enum Interpolant {
    Linear(LinearInterpolant),
    Spline(SmoothingSpline),
}

impl Interpolant {
    pub fn evaluate_many(&self, grid: &[f64]) -> Result<Vec<f64>> {
        match self {
            Interpolant::Linear(f) => f.evaluate_many(grid),
            Interpolant::Spline(f) => f.evaluate_many(grid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_match_the_method_lists() {
        for name in SMOOTHING_METHODS {
            assert!(SmoothMethod::from_name(name).is_ok());
            assert!(lookup(name).is_some());
        }
        for name in INTERPOLATION_METHODS {
            assert!(InterpMethod::from_name(name).is_ok());
            assert!(lookup(name).is_some());
        }
        assert_eq!(REGISTRY.len(), 5);
    }

    #[test]
    fn unknown_smoothing_method_lists_valid_names() {
        let err = SmoothMethod::from_name("wavelet").unwrap_err();
        match err {
            FermError::UnknownMethod { name, valid } => {
                assert_eq!(name, "wavelet");
                for expected in ["rolling", "ema", "savgol"] {
                    assert!(valid.iter().any(|v| v == expected));
                }
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn resolve_applies_overrides_and_validates() {
        let params = Params::new().with("window_length", 7).with("polyorder", 3);
        let method = SmoothMethod::resolve("savgol", &params).unwrap();
        assert_eq!(
            method,
            SmoothMethod::Savgol(SavgolParams {
                window_length: 7,
                polyorder: 3
            })
        );

        let bad = Params::new().with("window_length", 4);
        assert!(matches!(
            SmoothMethod::resolve("savgol", &bad),
            Err(FermError::InvalidParameter { .. })
        ));
        let unknown_key = Params::new().with("alpha", 0.5);
        assert!(SmoothMethod::resolve("ema", &unknown_key).is_err());
    }

    #[test]
    fn parse_stage_reads_name_and_pairs() {
        assert_eq!(
            SmoothMethod::parse_stage("ema:span=3").unwrap(),
            SmoothMethod::Ema(EmaParams { span: 3.0 })
        );
        assert_eq!(
            SmoothMethod::parse_stage("rolling").unwrap(),
            SmoothMethod::Rolling(RollingParams::default())
        );
        assert!(SmoothMethod::parse_stage("rolling:window").is_err());
    }

    #[test]
    fn spline_smoother_is_evaluated_at_the_curve_points() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 4.0, 9.0, 16.0];
        let out = SmoothMethod::from_name("spline").unwrap().apply(&x, &y).unwrap();
        for (a, b) in out.iter().zip(y) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn interpolation_rejects_smoothing_only_names() {
        assert!(matches!(
            InterpMethod::from_name("rolling"),
            Err(FermError::UnknownMethod { .. })
        ));
    }
}
