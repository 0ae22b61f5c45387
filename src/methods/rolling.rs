//! Rolling (moving) average.

use crate::error::{FermError, Result};
use crate::methods::parse_param;

/// Parameters of the rolling average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingParams {
    /// Number of points in the window.
    pub window: usize,
    /// Center the window on each point (otherwise the window trails it).
    pub center: bool,
}

impl Default for RollingParams {
    fn default() -> Self {
        Self {
            window: 5,
            center: true,
        }
    }
}

impl RollingParams {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "window" => self.window = parse_param("rolling", key, value)?,
            "center" => self.center = parse_param("rolling", key, value)?,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(FermError::invalid_parameter("rolling window must be at least 1"));
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> FermError {
    FermError::invalid_parameter(format!(
        "rolling has no parameter `{key}` (expected `window` or `center`)"
    ))
}

/// Mean over a sliding window with `min_periods = 1`.
///
/// Windows are clipped at the curve ends, so the first and last points are
/// averaged over fewer values instead of becoming missing. Missing values are
/// skipped inside a window; a window with no valid value yields NaN.
///
/// A centered window of length `w` spans `w - 1 - (w - 1) / 2` points before
/// and `(w - 1) / 2` points after each position (for even `w` the extra point
/// goes on the left).
pub fn rolling_average(y: &[f64], params: &RollingParams) -> Result<Vec<f64>> {
    params.validate()?;

    let n = y.len();
    let w = params.window;
    let (before, after) = if params.center {
        let after = (w - 1) / 2;
        (w - 1 - after, after)
    } else {
        (w - 1, 0)
    };

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(before);
        let hi = (i + after).min(n - 1);
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in &y[lo..=hi] {
            if !v.is_nan() {
                sum += v;
                count += 1;
            }
        }
        out.push(if count == 0 { f64::NAN } else { sum / count as f64 });
    }

    Ok(out)
}
