//! Exponential moving average.

use crate::error::{FermError, Result};
use crate::methods::parse_param;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaParams {
    /// Decay in terms of span: `alpha = 2 / (span + 1)`.
    pub span: f64,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self { span: 10.0 }
    }
}

impl EmaParams {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "span" => self.span = parse_param("ema", key, value)?,
            _ => {
                return Err(FermError::invalid_parameter(format!(
                    "ema has no parameter `{key}` (expected `span`)"
                )));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.span.is_finite() && self.span >= 1.0) {
            return Err(FermError::invalid_parameter(format!(
                "ema span must be >= 1, got {}",
                self.span
            )));
        }
        Ok(())
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.span + 1.0)
    }
}

/// Recursive exponential smoothing without start-up bias correction.
///
/// `m_0 = y_0`, `m_t = (1 - α) m_{t-1} + α y_t`.
///
/// A missing value does not reset the recursion: the previous mean is carried
/// forward while its weight keeps decaying, so the next observation is blended
/// in with relatively more weight. Leading missing values stay missing.
pub fn exponential_moving_average(y: &[f64], params: &EmaParams) -> Result<Vec<f64>> {
    params.validate()?;

    let alpha = params.alpha();
    let decay = 1.0 - alpha;

    let mut out = Vec::with_capacity(y.len());
    let mut mean = f64::NAN;
    let mut old_weight = 1.0;

    for &v in y {
        if mean.is_nan() {
            mean = v;
            old_weight = 1.0;
        } else {
            old_weight *= decay;
            if !v.is_nan() {
                if mean != v {
                    mean = (old_weight * mean + alpha * v) / (old_weight + alpha);
                }
                old_weight = 1.0;
            }
        }
        out.push(mean);
    }

    Ok(out)
}
