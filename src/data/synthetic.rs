//! Synthetic growth curves with Gaussian measurement noise.
//!
//! Every sample shares the same noiseless model curve and gets its own noise
//! draw. The RNG is seeded, so a given `(model, time, samples, noise, seed)`
//! always yields the same table.

use std::f64::consts::E;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Column, Table};
use crate::error::{FermError, Result};

/// Deterministic population curve `N(t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthModel {
    /// Verhulst logistic growth from `n0` towards the carrying capacity `n_max`.
    Logistic { n0: f64, r: f64, n_max: f64 },
    /// `a · exp(-b · exp(-c t))`.
    Gompertz { a: f64, b: f64, c: f64 },
    /// Zwietering's reparameterisation: asymptote `a`, lag time `lag`, maximum
    /// specific growth rate `mu`.
    ModifiedGompertz { a: f64, lag: f64, mu: f64 },
}

impl GrowthModel {
    /// Model with parameters typical of a batch fermentation over ~24 time units.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "logistic" => Ok(GrowthModel::Logistic {
                n0: 0.05,
                r: 0.5,
                n_max: 2.0,
            }),
            "gompertz" => Ok(GrowthModel::Gompertz { a: 2.0, b: 5.0, c: 0.3 }),
            "modified-gompertz" | "modified_gompertz" => Ok(GrowthModel::ModifiedGompertz {
                a: 2.0,
                lag: 4.0,
                mu: 0.4,
            }),
            _ => Err(FermError::UnknownMethod {
                name: name.to_string(),
                valid: ["logistic", "gompertz", "modified-gompertz"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            GrowthModel::Logistic { n0, r, n_max } => n0 > 0.0 && n_max > 0.0 && r.is_finite(),
            GrowthModel::Gompertz { a, b, c } => a.is_finite() && b.is_finite() && c.is_finite(),
            GrowthModel::ModifiedGompertz { a, lag, mu } => a > 0.0 && lag.is_finite() && mu.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(FermError::invalid_parameter(format!("invalid growth model parameters: {self:?}")))
        }
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        match *self {
            GrowthModel::Logistic { n0, r, n_max } => n_max / (1.0 + (n_max - n0) / n0 * (-r * t).exp()),
            GrowthModel::Gompertz { a, b, c } => a * (-b * (-c * t).exp()).exp(),
            GrowthModel::ModifiedGompertz { a, lag, mu } => a * (-(mu * E / a * (lag - t) + 1.0).exp()).exp(),
        }
    }
}

/// Long-format table of `samples` noisy curves on the shared `time` grid.
///
/// Columns: `sample_id` (`sample_1`, `sample_2`, ...), `time`, `value`.
pub fn generate_curves(
    model: &GrowthModel,
    time: &[f64],
    samples: usize,
    noise_std: f64,
    seed: u64,
) -> Result<Table> {
    model.validate()?;
    if !(noise_std.is_finite() && noise_std >= 0.0) {
        return Err(FermError::invalid_parameter(format!(
            "noise_std must be finite and >= 0, got {noise_std}"
        )));
    }
    let normal = Normal::new(0.0, noise_std)
        .map_err(|e| FermError::invalid_parameter(format!("noise distribution: {e}")))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let n = samples * time.len();
    let mut ids = Vec::with_capacity(n);
    let mut times = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);

    for s in 0..samples {
        let id = format!("sample_{}", s + 1);
        for &t in time {
            ids.push(id.clone());
            times.push(t);
            values.push(model.evaluate(t) + normal.sample(&mut rng));
        }
    }

    Table::from_columns(vec![
        ("sample_id".to_string(), Column::Text(ids)),
        ("time".to_string(), Column::Numeric(times)),
        ("value".to_string(), Column::Numeric(values)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<f64> {
        (0..=24).map(f64::from).collect()
    }

    #[test]
    fn models_start_low_and_approach_the_asymptote() {
        for name in ["logistic", "gompertz", "modified-gompertz"] {
            let model = GrowthModel::from_name(name).unwrap();
            let start = model.evaluate(0.0);
            let end = model.evaluate(200.0);
            assert!(start < 0.5, "{name}: {start}");
            assert!((end - 2.0).abs() < 1e-6, "{name}: {end}");
        }
    }

    #[test]
    fn logistic_starts_at_n0() {
        let model = GrowthModel::Logistic { n0: 0.1, r: 1.0, n_max: 3.0 };
        assert!((model.evaluate(0.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn same_seed_same_table() {
        let model = GrowthModel::from_name("logistic").unwrap();
        let a = generate_curves(&model, &grid(), 3, 0.05, 7).unwrap();
        let b = generate_curves(&model, &grid(), 3, 0.05, 7).unwrap();
        let c = generate_curves(&model, &grid(), 3, 0.05, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.n_rows(), 75);
        assert_eq!(a.column_names(), &["sample_id", "time", "value"]);
    }

    #[test]
    fn zero_noise_reproduces_the_model() {
        let model = GrowthModel::from_name("gompertz").unwrap();
        let table = generate_curves(&model, &grid(), 1, 0.0, 1).unwrap();
        for (t, v) in table.numeric("time").unwrap().iter().zip(table.numeric("value").unwrap()) {
            assert_eq!(*v, model.evaluate(*t));
        }
    }

    #[test]
    fn rejects_negative_noise_and_unknown_models() {
        let model = GrowthModel::from_name("logistic").unwrap();
        assert!(generate_curves(&model, &grid(), 1, -1.0, 0).is_err());
        assert!(GrowthModel::from_name("monod").is_err());
    }
}
