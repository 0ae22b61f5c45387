//! Per-curve smoothing and interpolation methods.
//!
//! Every function here works on a single curve; grouping lives in
//! [`crate::dispatch`].

pub mod ema;
pub mod linear;
pub mod registry;
pub mod rolling;
pub mod savgol;
pub mod spline;

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{FermError, Result};

pub use ema::{EmaParams, exponential_moving_average};
pub use linear::{DuplicatePolicy, LinearInterpolant, LinearParams};
pub use registry::{InterpMethod, Interpolant, MethodInfo, Params, REGISTRY, SmoothMethod};
pub use rolling::{RollingParams, rolling_average};
pub use savgol::{SavgolParams, savitzky_golay};
pub use spline::{SmoothingSpline, SplineParams};

/// How an interpolant treats query points outside the fitted x range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    /// Return NaN.
    #[default]
    Fill,
    /// Fail with `OutOfBounds`.
    Error,
    /// Continue the boundary piece.
    Extrapolate,
}

impl FromStr for BoundsPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fill" | "nan" => Ok(BoundsPolicy::Fill),
            "error" => Ok(BoundsPolicy::Error),
            "extrapolate" => Ok(BoundsPolicy::Extrapolate),
            other => Err(format!("unknown bounds policy `{other}` (fill|error|extrapolate)")),
        }
    }
}

impl std::fmt::Display for BoundsPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BoundsPolicy::Fill => "fill",
            BoundsPolicy::Error => "error",
            BoundsPolicy::Extrapolate => "extrapolate",
        })
    }
}

/// Parse one `key=value` override into a typed field.
pub(crate) fn parse_param<T>(method: &str, key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        FermError::invalid_parameter(format!("{method}: cannot parse {key}=`{value}`: {e}"))
    })
}

/// Stable ascending order of `x`; NaN positions go last in their original order.
pub fn sort_order(x: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| match (x[a].is_nan(), x[b].is_nan()) {
        (false, false) => x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
    order
}

/// `(x, y)` pairs in [`sort_order`].
pub(crate) fn sort_pairs_by_x(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    sort_order(x).into_iter().map(|i| (x[i], y[i])).collect()
}
