//! Smoothness and fit-quality metrics.

use serde_json::{Map, Value};

use crate::dispatch;
use crate::domain::{Column, GroupKey, Table};
use crate::error::{FermError, Result};

/// RMSE and R² of a smoothed signal against the original.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitQuality {
    pub rmse: f64,
    pub r2: f64,
}

impl FitQuality {
    fn undefined() -> Self {
        Self {
            rmse: f64::NAN,
            r2: f64::NAN,
        }
    }
}

/// Sum of absolute consecutive differences, ignoring missing values.
///
/// With `normalize` the sum is divided by the value range (0 for a constant
/// signal). NaN when fewer than two values are present.
pub fn total_variation(values: &[f64], normalize: bool) -> f64 {
    let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.len() < 2 {
        return f64::NAN;
    }

    let tv: f64 = clean.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    if !normalize {
        return tv;
    }

    let (min, max) = clean
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range == 0.0 { 0.0 } else { tv / range }
}

/// RMSE and R² over the positions where both inputs are present.
pub fn fit_quality(original: &[f64], smoothed: &[f64]) -> Result<FitQuality> {
    if original.len() != smoothed.len() {
        return Err(FermError::length_mismatch(original.len(), smoothed.len()));
    }

    let pairs: Vec<(f64, f64)> = original
        .iter()
        .zip(smoothed)
        .filter(|(o, s)| !o.is_nan() && !s.is_nan())
        .map(|(&o, &s)| (o, s))
        .collect();
    if pairs.len() < 2 {
        return Ok(FitQuality::undefined());
    }

    let n = pairs.len() as f64;
    let mean = pairs.iter().map(|(o, _)| o).sum::<f64>() / n;
    let ss_res: f64 = pairs.iter().map(|(o, s)| (o - s).powi(2)).sum();
    let ss_tot: f64 = pairs.iter().map(|(o, _)| (o - mean).powi(2)).sum();

    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(FitQuality {
        rmse: (ss_res / n).sqrt(),
        r2,
    })
}

/// Metrics for one group (or the whole table).
#[derive(Debug, Clone, PartialEq)]
pub struct QualityRow {
    pub key: Option<GroupKey>,
    pub original_smoothness: f64,
    pub smoothed_smoothness: f64,
    pub fit: FitQuality,
}

/// Output of [`evaluate_quality`]; column names derive from the input column names.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub original: String,
    pub smoothed: String,
    pub group: Option<String>,
    pub rows: Vec<QualityRow>,
}

impl QualityReport {
    /// Names of the four metric columns, in output order.
    pub fn metric_names(&self) -> [String; 4] {
        let (o, s) = (&self.original, &self.smoothed);
        [
            format!("{o}_smoothness"),
            format!("{s}_smoothness"),
            format!("{o}_{s}_rmse_fit"),
            format!("{o}_{s}_r2_fit"),
        ]
    }

    fn metric_values(row: &QualityRow) -> [f64; 4] {
        [
            row.original_smoothness,
            row.smoothed_smoothness,
            row.fit.rmse,
            row.fit.r2,
        ]
    }

    /// One row per group, group column first when grouped.
    pub fn to_table(&self) -> Result<Table> {
        let mut columns = Vec::with_capacity(5);
        if let Some(group) = &self.group {
            let keys = self.rows.iter().filter_map(|r| r.key.clone());
            columns.push((group.clone(), key_column(keys.collect())));
        }
        for (j, name) in self.metric_names().into_iter().enumerate() {
            let values = self.rows.iter().map(|r| Self::metric_values(r)[j]).collect();
            columns.push((name, Column::Numeric(values)));
        }
        Table::from_columns(columns)
    }

    /// Records as JSON objects; missing metrics become `null`.
    pub fn to_json(&self) -> Value {
        let names = self.metric_names();
        let records = self
            .rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                if let (Some(group), Some(key)) = (&self.group, &row.key) {
                    record.insert(group.clone(), serde_json::to_value(key).unwrap_or(Value::Null));
                }
                for (name, v) in names.iter().zip(Self::metric_values(row)) {
                    let value = serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null);
                    record.insert(name.clone(), value);
                }
                Value::Object(record)
            })
            .collect();
        Value::Array(records)
    }
}

fn key_column(keys: Vec<GroupKey>) -> Column {
    if keys.iter().all(|k| matches!(k, GroupKey::Number(_))) {
        Column::Numeric(
            keys.iter()
                .filter_map(|k| match k {
                    GroupKey::Number(v) => Some(*v),
                    GroupKey::Text(_) => None,
                })
                .collect(),
        )
    } else {
        Column::Text(keys.iter().map(ToString::to_string).collect())
    }
}

/// Score `smoothed` against `original`, per group when `group` is given.
///
/// Each group is sorted by `x` first. Smoothness is the normalized total
/// variation of each column. A grouped report on an empty table has no rows.
pub fn evaluate_quality(
    table: &Table,
    x: &str,
    original: &str,
    smoothed: &str,
    group: Option<&str>,
) -> Result<QualityReport> {
    table.numeric(original)?;
    table.numeric(smoothed)?;

    let rows = dispatch::partition(table, x, group)?
        .into_iter()
        // an empty grouped table has no groups to score
        .filter(|part| group.is_none() || part.key.is_some())
        .map(|part| -> Result<QualityRow> {
            let o = part.table.numeric(original)?;
            let s = part.table.numeric(smoothed)?;
            Ok(QualityRow {
                key: part.key,
                original_smoothness: total_variation(o, true),
                smoothed_smoothness: total_variation(s, true),
                fit: fit_quality(o, s)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QualityReport {
        original: original.to_string(),
        smoothed: smoothed.to_string(),
        group: group.map(str::to_string),
        rows,
    })
}
