//! Smoothing spline of degree `k`.
//!
//! The spline lives on the interpolating B-spline basis of the distinct x
//! values (see [`BSplineBasis::interpolating`]). With `s = 0` the coefficients
//! solve the collocation system, so the curve passes through every point
//! (duplicated x are averaged in the least-squares sense). With `s > 0` the
//! coefficients minimise
//!
//! ```text
//! ||y - B c||² + λ ||D₂ c||²
//! ```
//!
//! and λ is the largest weight whose residual sum of squares stays within `s`.
//! Each step of that search is one banded solve of the normal equations, so a
//! fit costs time linear in the number of points.

use log::debug;
use nalgebra::DVector;

use crate::error::{FermError, Result};
use crate::math::{BSplineBasis, PenalizedSystem, residual_sum_of_squares, solve_least_squares};
use crate::methods::{BoundsPolicy, parse_param, sort_pairs_by_x};

const MAX_DEGREE: usize = 5;

/// λ is searched as `scale · 10^t` for `t` in this range.
const LOG_LAMBDA_RANGE: (f64, f64) = (-10.0, 10.0);
const BISECTION_STEPS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineParams {
    pub degree: usize,
    /// Upper bound on the residual sum of squares; 0 interpolates.
    pub smoothing_factor: f64,
    pub bounds: BoundsPolicy,
}

impl Default for SplineParams {
    fn default() -> Self {
        Self {
            degree: 3,
            smoothing_factor: 0.0,
            bounds: BoundsPolicy::Extrapolate,
        }
    }
}

impl SplineParams {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "degree" | "k" => self.degree = parse_param("spline", key, value)?,
            "smoothing_factor" | "s" => self.smoothing_factor = parse_param("spline", key, value)?,
            "bounds" => self.bounds = parse_param("spline", key, value)?,
            _ => {
                return Err(FermError::invalid_parameter(format!(
                    "spline has no parameter `{key}` (expected `smoothing_factor`, `degree` or `bounds`)"
                )));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DEGREE).contains(&self.degree) {
            return Err(FermError::invalid_parameter(format!(
                "spline degree must be between 1 and {MAX_DEGREE}, got {}",
                self.degree
            )));
        }
        if !(self.smoothing_factor.is_finite() && self.smoothing_factor >= 0.0) {
            return Err(FermError::invalid_parameter(format!(
                "spline smoothing_factor must be finite and >= 0, got {}",
                self.smoothing_factor
            )));
        }
        Ok(())
    }
}

/// A fitted spline, ready to evaluate anywhere.
#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    basis: BSplineBasis,
    coefficients: Vec<f64>,
    rss: f64,
    bounds: BoundsPolicy,
}

impl SmoothingSpline {
    pub fn fit(x: &[f64], y: &[f64], params: &SplineParams) -> Result<Self> {
        params.validate()?;
        if x.len() != y.len() {
            return Err(FermError::length_mismatch(x.len(), y.len()));
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = sort_pairs_by_x(x, y)
            .into_iter()
            .filter(|(xi, yi)| xi.is_finite() && yi.is_finite())
            .unzip();

        let mut distinct = xs.clone();
        distinct.dedup();
        let k = params.degree;
        if distinct.len() < k + 1 {
            return Err(FermError::insufficient_data("spline", k + 1, distinct.len()));
        }

        let basis = BSplineBasis::interpolating(&distinct, k);
        let s = params.smoothing_factor;
        let (coefficients, rss) = if s == 0.0 {
            let design = basis.design_matrix(&xs);
            let target = DVector::from_vec(ys);
            let exact = solve_least_squares(&design, &target)
                .ok_or_else(|| FermError::computation("spline collocation system has no finite solution"))?;
            let rss = residual_sum_of_squares(&design, &exact, &target);
            (exact.iter().copied().collect(), rss)
        } else {
            let rows = xs
                .iter()
                .map(|&x| {
                    let (span, values) = basis.nonzero(x);
                    (span - k, values)
                })
                .collect();
            let system = PenalizedSystem::new(rows, ys, basis.n_coefficients(), 2);
            let exact = system
                .solve(0.0)
                .ok_or_else(|| FermError::computation("spline collocation system has no finite solution"))?;
            let exact_rss = system.residual_sum_of_squares(&exact);
            let coefficients = if s <= exact_rss { exact } else { smooth_coefficients(&system, s, exact) };
            let rss = system.residual_sum_of_squares(&coefficients);
            (coefficients, rss)
        };

        Ok(Self {
            basis,
            coefficients,
            rss,
            bounds: params.bounds,
        })
    }

    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn domain(&self) -> (f64, f64) {
        self.basis.domain()
    }

    /// Residual sum of squares of the fit on its own data.
    pub fn residual_sum_of_squares(&self) -> f64 {
        self.rss
    }

    pub fn evaluate(&self, x: f64) -> Result<f64> {
        if x.is_nan() {
            return Ok(f64::NAN);
        }
        let (lo, hi) = self.domain();
        if x < lo || x > hi {
            match self.bounds {
                BoundsPolicy::Fill => return Ok(f64::NAN),
                BoundsPolicy::Error => return Err(FermError::OutOfBounds { value: x, min: lo, max: hi }),
                BoundsPolicy::Extrapolate => {}
            }
        }
        Ok(self.basis.evaluate(&self.coefficients, x))
    }

    pub fn evaluate_many(&self, grid: &[f64]) -> Result<Vec<f64>> {
        grid.iter().map(|&x| self.evaluate(x)).collect()
    }
}

/// Bisect on `log10 λ` for the stiffest fit with `rss <= s`.
///
/// Falls back to `fallback` (the exact fit) if no penalized solve qualifies.
fn smooth_coefficients(system: &PenalizedSystem, s: f64, fallback: Vec<f64>) -> Vec<f64> {
    let scale = system.penalty_scale();
    let fit_at = |t: f64| -> Option<(Vec<f64>, f64)> {
        let coefs = system.solve(scale * 10f64.powf(t))?;
        let rss = system.residual_sum_of_squares(&coefs);
        Some((coefs, rss))
    };

    let (mut lo, mut hi) = LOG_LAMBDA_RANGE;
    if let Some((coefs, rss)) = fit_at(hi) {
        if rss <= s {
            debug!("spline: s={s} reaches the stiffest fit (rss={rss:.6})");
            return coefs;
        }
    }

    let mut best = fallback;
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        match fit_at(mid) {
            Some((coefs, rss)) if rss <= s => {
                best = coefs;
                lo = mid;
            }
            _ => hi = mid,
        }
    }
    debug!("spline: s={s} -> log10(lambda/scale)={lo:.4}");
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(x: &[f64], y: &[f64], params: SplineParams) -> SmoothingSpline {
        SmoothingSpline::fit(x, y, &params).unwrap()
    }

    #[test]
    fn interpolates_the_data_when_s_is_zero() {
        let x = [0.0, 0.7, 1.5, 2.0, 3.1, 4.0, 5.5];
        let y = [1.0, 3.0, -2.0, 0.5, 4.0, 4.2, 0.0];
        let f = fit(&x, &y, SplineParams::default());
        for (xi, yi) in x.iter().zip(y) {
            assert!((f.evaluate(*xi).unwrap() - yi).abs() < 1e-8);
        }
        assert!(f.residual_sum_of_squares() < 1e-12);
    }

    #[test]
    fn reproduces_a_cubic_inside_and_outside_the_data() {
        let cubic = |t: f64| 0.5 * t * t * t - t * t + 2.0;
        let x: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|&t| cubic(t)).collect();
        let f = fit(&x, &y, SplineParams::default());
        for t in [0.25, 1.3, 3.4, -0.5, 4.0] {
            assert!((f.evaluate(t).unwrap() - cubic(t)).abs() < 1e-7, "t = {t}");
        }
    }

    #[test]
    fn positive_s_bounds_the_residuals_and_smooths() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, t)| 0.3 * t + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let s = 5.0;
        let f = fit(
            &x,
            &y,
            SplineParams {
                smoothing_factor: s,
                ..SplineParams::default()
            },
        );
        let rss = f.residual_sum_of_squares();
        assert!(rss <= s + 1e-9);
        assert!((rss - s).abs() < 1e-2, "rss = {rss}");

        let fitted = f.evaluate_many(&x).unwrap();
        let tv = |v: &[f64]| v.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>();
        assert!(tv(&fitted) < tv(&y));
    }

    #[test]
    fn smoothing_a_long_curve_stays_fast() {
        let x: Vec<f64> = (0..300).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&t| 8.0 / (1.0 + (-0.4 * (t - 15.0)).exp()) + 0.2 * (7.3 * t).sin())
            .collect();
        let params = SplineParams {
            smoothing_factor: 1.0,
            ..SplineParams::default()
        };

        let started = std::time::Instant::now();
        let f = fit(&x, &y, params);
        let elapsed = started.elapsed();

        assert!(elapsed < std::time::Duration::from_secs(2), "fit took {elapsed:?}");
        let rss = f.residual_sum_of_squares();
        assert!(rss <= 1.0 + 1e-9 && rss > 0.5, "rss = {rss}");
    }

    #[test]
    fn missing_pairs_are_excluded() {
        let x = [0.0, 1.0, f64::NAN, 2.0, 3.0];
        let y = [0.0, 1.0, 5.0, f64::NAN, 3.0];
        let f = fit(&x, &y, SplineParams { degree: 1, ..SplineParams::default() });
        assert!((f.evaluate(2.0).unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn needs_degree_plus_one_distinct_points() {
        let err = SmoothingSpline::fit(&[0.0, 1.0, 1.0, 2.0], &[0.0; 4], &SplineParams::default()).unwrap_err();
        assert!(matches!(err, FermError::InsufficientData { required: 4, available: 3, .. }));
    }

    #[test]
    fn rejects_bad_parameters() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [0.0; 7];
        for params in [
            SplineParams { degree: 0, ..SplineParams::default() },
            SplineParams { degree: 6, ..SplineParams::default() },
            SplineParams { smoothing_factor: -1.0, ..SplineParams::default() },
            SplineParams { smoothing_factor: f64::INFINITY, ..SplineParams::default() },
        ] {
            assert!(matches!(
                SmoothingSpline::fit(&x, &y, &params),
                Err(FermError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn fill_policy_masks_outside_the_data() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let f = fit(&x, &x, SplineParams { bounds: BoundsPolicy::Fill, ..SplineParams::default() });
        assert!(f.evaluate(3.5).unwrap().is_nan());
        assert!((f.evaluate(3.0).unwrap() - 3.0).abs() < 1e-10);
    }
}
