//! Savitzky-Golay polynomial smoothing.
//!
//! Each output point is the value, at that point, of the least-squares
//! polynomial of order `p` fitted to a window of `w` neighbours. Because the fit
//! is linear in the observations, every output is a fixed weighted sum of the
//! window, and the weights only depend on where in the window the point sits.
//!
//! With window offsets `z = -h..=h` (`h = (w - 1) / 2`) and the Vandermonde
//! design `A[i][j] = z_i^j`, the weights for position `z` are
//! `[1, z, z², ...] · pinv(A)`:
//!
//! - interior points use `z = 0` on the window centered on them
//! - the first / last `h` points reuse the first / last full window and
//!   evaluate the same polynomial off-center (`z ≠ 0`)
//!
//! so the output has exactly one value per input point.

use nalgebra::DMatrix;

use crate::error::{FermError, Result};
use crate::math::pseudo_inverse;
use crate::methods::parse_param;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavgolParams {
    /// Odd number of points per window.
    pub window_length: usize,
    /// Polynomial order, strictly below `window_length`.
    pub polyorder: usize,
}

impl Default for SavgolParams {
    fn default() -> Self {
        Self {
            window_length: 5,
            polyorder: 2,
        }
    }
}

impl SavgolParams {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "window_length" | "window" => self.window_length = parse_param("savgol", key, value)?,
            "polyorder" | "order" => self.polyorder = parse_param("savgol", key, value)?,
            _ => {
                return Err(FermError::invalid_parameter(format!(
                    "savgol has no parameter `{key}` (expected `window_length` or `polyorder`)"
                )));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_length % 2 == 0 {
            return Err(FermError::invalid_parameter(format!(
                "savgol window_length must be odd, got {}",
                self.window_length
            )));
        }
        if self.polyorder >= self.window_length {
            return Err(FermError::invalid_parameter(format!(
                "savgol polyorder ({}) must be less than window_length ({})",
                self.polyorder, self.window_length
            )));
        }
        Ok(())
    }
}

/// Filter weights for every offset `z = -h..=h`, indexed by `z + h`.
fn window_weights(params: &SavgolParams) -> Result<Vec<Vec<f64>>> {
    let w = params.window_length;
    let h = (w / 2) as isize;
    let cols = params.polyorder + 1;

    let design = DMatrix::from_fn(w, cols, |i, j| ((i as isize - h) as f64).powi(j as i32));
    let pinv = pseudo_inverse(&design).ok_or_else(|| {
        FermError::computation("savgol design matrix is singular for these parameters")
    })?;

    let weights = (-h..=h)
        .map(|z| {
            let z = z as f64;
            (0..w)
                .map(|col| {
                    (0..cols)
                        .map(|j| z.powi(j as i32) * pinv[(j, col)])
                        .sum::<f64>()
                })
                .collect()
        })
        .collect();

    Ok(weights)
}

/// Smooth `y` with a Savitzky-Golay filter.
///
/// Fails with `InvalidParameter` for an even window or `polyorder >= window_length`,
/// and with `InsufficientData` when the curve is shorter than one window.
pub fn savitzky_golay(y: &[f64], params: &SavgolParams) -> Result<Vec<f64>> {
    params.validate()?;

    let n = y.len();
    let w = params.window_length;
    if n < w {
        return Err(FermError::insufficient_data("savgol", w, n));
    }

    let weights = window_weights(params)?;
    let h = w / 2;

    let out: Vec<f64> = (0..n)
        .map(|i| {
            let start = i.saturating_sub(h).min(n - w);
            let z_index = i - start;
            weights[z_index]
                .iter()
                .zip(&y[start..start + w])
                .map(|(c, v)| c * v)
                .sum::<f64>()
        })
        .collect();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_weights_match_the_classic_table() {
        // Savitzky & Golay (1964): window 5, quadratic -> [-3, 12, 17, 12, -3] / 35
        let weights = window_weights(&SavgolParams::default()).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        for (c, e) in weights[2].iter().zip(expected) {
            assert!((c - e / 35.0).abs() < 1e-10);
        }
    }

    #[test]
    fn reproduces_polynomials_up_to_its_order_including_edges() {
        let y: Vec<f64> = (0..12)
            .map(|i| {
                let t = i as f64;
                1.0 - 0.5 * t + 0.25 * t * t
            })
            .collect();
        let out = savitzky_golay(&y, &SavgolParams { window_length: 7, polyorder: 2 }).unwrap();
        assert_eq!(out.len(), y.len());
        for (a, b) in out.iter().zip(&y) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn reduces_noise_on_a_zigzag() {
        let y: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let out = savitzky_golay(&y, &SavgolParams { window_length: 5, polyorder: 1 }).unwrap();
        let spread = |v: &[f64]| v[2..18].iter().map(|x| x.abs()).fold(0.0, f64::max);
        assert!(spread(&out) < spread(&y));
    }

    #[test]
    fn rejects_even_windows_and_high_orders() {
        let y = [0.0; 10];
        assert!(matches!(
            savitzky_golay(&y, &SavgolParams { window_length: 4, polyorder: 2 }),
            Err(FermError::InvalidParameter { .. })
        ));
        assert!(matches!(
            savitzky_golay(&y, &SavgolParams { window_length: 5, polyorder: 5 }),
            Err(FermError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn short_curves_fail_with_insufficient_data() {
        let err = savitzky_golay(&[1.0, 2.0], &SavgolParams::default()).unwrap_err();
        assert!(matches!(
            err,
            FermError::InsufficientData { required: 5, available: 2, .. }
        ));
    }

    #[test]
    fn missing_values_propagate_within_their_window() {
        let mut y: Vec<f64> = (0..11).map(f64::from).collect();
        y[5] = f64::NAN;
        let out = savitzky_golay(&y, &SavgolParams::default()).unwrap();
        assert!(out[0].is_finite());
        assert!(out[3..=7].iter().all(|v| v.is_nan()));
        assert!(out[10].is_finite());
    }
}
