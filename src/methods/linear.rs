//! Piecewise-linear interpolation.

use crate::error::{FermError, Result};
use crate::methods::{BoundsPolicy, parse_param, sort_pairs_by_x};

/// What to do when several points share the same x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the first point (in stable x order) and drop the rest.
    #[default]
    KeepFirst,
    /// Fail with `InvalidParameter`.
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-first" | "keep_first" | "first" => Ok(DuplicatePolicy::KeepFirst),
            "reject" | "error" => Ok(DuplicatePolicy::Reject),
            other => Err(format!("unknown duplicate policy `{other}` (keep-first|reject)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinearParams {
    /// Behavior outside `[x_min, x_max]`. Defaults to filling with NaN.
    pub bounds: BoundsPolicy,
    pub duplicates: DuplicatePolicy,
}

impl LinearParams {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bounds" => self.bounds = parse_param("linear", key, value)?,
            "duplicates" => self.duplicates = parse_param("linear", key, value)?,
            _ => {
                return Err(FermError::invalid_parameter(format!(
                    "linear has no parameter `{key}` (expected `bounds` or `duplicates`)"
                )));
            }
        }
        Ok(())
    }
}

/// A fitted piecewise-linear function.
#[derive(Debug, Clone)]
pub struct LinearInterpolant {
    xs: Vec<f64>,
    ys: Vec<f64>,
    bounds: BoundsPolicy,
}

impl LinearInterpolant {
    /// Build the interpolant from `(x, y)` pairs in any order.
    ///
    /// Pairs with a missing or infinite x are dropped; a missing y is kept and
    /// poisons the two segments touching it. Needs at least two distinct x values.
    pub fn fit(x: &[f64], y: &[f64], params: &LinearParams) -> Result<Self> {
        if x.len() != y.len() {
            return Err(FermError::length_mismatch(x.len(), y.len()));
        }

        let pairs = sort_pairs_by_x(x, y);
        let mut xs: Vec<f64> = Vec::with_capacity(pairs.len());
        let mut ys: Vec<f64> = Vec::with_capacity(pairs.len());
        for (xi, yi) in pairs {
            if !xi.is_finite() {
                continue;
            }
            if xs.last() == Some(&xi) {
                match params.duplicates {
                    DuplicatePolicy::KeepFirst => continue,
                    DuplicatePolicy::Reject => {
                        return Err(FermError::invalid_parameter(format!(
                            "duplicate x value {xi} in linear interpolation input"
                        )));
                    }
                }
            }
            xs.push(xi);
            ys.push(yi);
        }

        if xs.len() < 2 {
            return Err(FermError::insufficient_data("linear", 2, xs.len()));
        }

        Ok(Self {
            xs,
            ys,
            bounds: params.bounds,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn evaluate(&self, x: f64) -> Result<f64> {
        if x.is_nan() {
            return Ok(f64::NAN);
        }
        let (lo, hi) = self.domain();
        let n = self.xs.len();

        let (a, b) = if x < lo || x > hi {
            match self.bounds {
                BoundsPolicy::Fill => return Ok(f64::NAN),
                BoundsPolicy::Error => {
                    return Err(FermError::OutOfBounds {
                        value: x,
                        min: lo,
                        max: hi,
                    });
                }
                BoundsPolicy::Extrapolate if x < lo => (0, 1),
                BoundsPolicy::Extrapolate => (n - 2, n - 1),
            }
        } else {
            // First index with xs[idx] > x; exact knots return their own value.
            let idx = self.xs.partition_point(|&v| v <= x);
            if self.xs[idx - 1] == x {
                return Ok(self.ys[idx - 1]);
            }
            (idx - 1, idx)
        };

        let (x0, x1) = (self.xs[a], self.xs[b]);
        let (y0, y1) = (self.ys[a], self.ys[b]);
        Ok(y0 + (x - x0) * (y1 - y0) / (x1 - x0))
    }

    pub fn evaluate_many(&self, grid: &[f64]) -> Result<Vec<f64>> {
        grid.iter().map(|&x| self.evaluate(x)).collect()
    }
}
