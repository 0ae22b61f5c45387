//! Public facade: smoothing and interpolation over (optionally grouped) tables.
//!
//! Every entry point validates the column names first, then hands one
//! x-sorted partition per group to the method and reassembles the result via
//! [`crate::dispatch`].

use std::slice;

use crate::dispatch::{self, GroupOutcome, Partition};
use crate::domain::{Column, CurveColumns, Table};
use crate::error::Result;
use crate::methods::{InterpMethod, Params, SmoothMethod};

/// Suffix of the column added by [`smooth`].
pub const DEFAULT_SUFFIX: &str = "_smooth";
/// Suffix of the value column produced by [`interpolate`].
pub const INTERP_SUFFIX: &str = "_interp";

/// Smooth `columns.y` per group, adding `{y}_smooth`.
pub fn smooth(table: &Table, columns: &CurveColumns, method: &SmoothMethod) -> Result<Table> {
    smooth_sequential(table, columns, slice::from_ref(method), DEFAULT_SUFFIX)
}

/// Like [`smooth`], but resolves the method by name first.
pub fn smooth_named(table: &Table, columns: &CurveColumns, name: &str, params: &Params) -> Result<Table> {
    let method = SmoothMethod::resolve(name, params)?;
    smooth(table, columns, &method)
}

/// Run smoothing stages in order; stage `i + 1` consumes the output of stage `i`.
///
/// Only the final values are kept, as `{y}{output_suffix}`. With no stages the
/// new column is a copy of y.
pub fn smooth_sequential(
    table: &Table,
    columns: &CurveColumns,
    stages: &[SmoothMethod],
    output_suffix: &str,
) -> Result<Table> {
    columns.validate(table)?;
    for stage in stages {
        stage.validate()?;
    }
    dispatch::apply(table, &columns.x, columns.group.as_deref(), |part| {
        smooth_partition(part, columns, stages, output_suffix)
    })
}

/// Per-group outcomes of [`smooth_sequential`], for callers that want to skip
/// failing groups (see [`dispatch::collect`]).
pub fn smooth_each(
    table: &Table,
    columns: &CurveColumns,
    stages: &[SmoothMethod],
    output_suffix: &str,
) -> Result<Vec<GroupOutcome>> {
    columns.validate(table)?;
    for stage in stages {
        stage.validate()?;
    }
    dispatch::apply_each(table, &columns.x, columns.group.as_deref(), |part| {
        smooth_partition(part, columns, stages, output_suffix)
    })
}

fn smooth_partition(
    part: &Partition,
    columns: &CurveColumns,
    stages: &[SmoothMethod],
    output_suffix: &str,
) -> Result<Table> {
    let x = part.table.numeric(&columns.x)?;
    let mut values = part.table.numeric(&columns.y)?.to_vec();
    if !values.is_empty() {
        for stage in stages {
            values = stage.apply(x, &values)?;
        }
    }
    part.table
        .with_column(format!("{}{output_suffix}", columns.y), Column::Numeric(values))
}

/// Evaluate each group's interpolant on the shared grid `new_x`.
///
/// The output has one row per grid point per group: the x column (holding the
/// grid), `{y}_interp`, and the group column when grouping.
pub fn interpolate(table: &Table, columns: &CurveColumns, new_x: &[f64], method: &InterpMethod) -> Result<Table> {
    columns.validate(table)?;
    dispatch::apply(table, &columns.x, columns.group.as_deref(), |part| {
        interpolate_partition(part, columns, new_x, method)
    })
}

/// Like [`interpolate`], but resolves the method by name first.
pub fn interpolate_named(
    table: &Table,
    columns: &CurveColumns,
    new_x: &[f64],
    name: &str,
    params: &Params,
) -> Result<Table> {
    let method = InterpMethod::resolve(name, params)?;
    interpolate(table, columns, new_x, &method)
}

fn interpolate_partition(
    part: &Partition,
    columns: &CurveColumns,
    new_x: &[f64],
    method: &InterpMethod,
) -> Result<Table> {
    let x = part.table.numeric(&columns.x)?;
    let y = part.table.numeric(&columns.y)?;
    let values = method.fit(x, y)?.evaluate_many(new_x)?;

    let mut out = vec![
        (columns.x.clone(), Column::Numeric(new_x.to_vec())),
        (format!("{}{INTERP_SUFFIX}", columns.y), Column::Numeric(values)),
    ];
    if let (Some(group), Some(key)) = (&columns.group, &part.key) {
        out.push((group.clone(), Column::repeat_key(key, new_x.len())));
    }
    Table::from_columns(out)
}

/// `count` evenly spaced points from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}
