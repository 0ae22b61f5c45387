//! Tabular data model.
//!
//! The engine works on a small column store rather than a dataframe library:
//!
//! - a `Table` is an ordered list of equally long, named columns
//! - a column is numeric (`f64`, missing = NaN) or text
//! - only the x, y and optional group columns are interpreted; everything else
//!   rides along untouched
//!
//! Tables are values. Every operation returns a new table and never mutates
//! its input.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::{FermError, Result};

/// A single column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    /// Group key of row `i`.
    pub fn key_at(&self, i: usize) -> GroupKey {
        match self {
            Column::Numeric(v) => GroupKey::Number(v[i]),
            Column::Text(v) => GroupKey::Text(v[i].clone()),
        }
    }

    /// Gather rows by index (indices may repeat or be reordered).
    pub fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// A column holding `key` repeated `n` times.
    pub fn repeat_key(key: &GroupKey, n: usize) -> Column {
        match key {
            GroupKey::Number(v) => Column::Numeric(vec![*v; n]),
            GroupKey::Text(s) => Column::Text(vec![s.clone(); n]),
        }
    }

    /// Render cell `i` for text output (NaN as an empty cell).
    pub fn cell_string(&self, i: usize) -> String {
        match self {
            Column::Numeric(v) => {
                if v[i].is_nan() {
                    String::new()
                } else {
                    v[i].to_string()
                }
            }
            Column::Text(v) => v[i].clone(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Column::Numeric(_) => "numeric",
            Column::Text(_) => "text",
        }
    }

    fn append(&mut self, other: &Column) -> bool {
        match (self, other) {
            (Column::Numeric(a), Column::Numeric(b)) => a.extend_from_slice(b),
            (Column::Text(a), Column::Text(b)) => a.extend(b.iter().cloned()),
            _ => return false,
        }
        true
    }
}

/// Identifier of one curve inside a table.
///
/// Keys are totally ordered so partitions come out in a deterministic order:
/// numbers first (by `total_cmp`), then text (lexicographic).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Number(f64),
    Text(String),
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            (GroupKey::Number(_), GroupKey::Text(_)) => Ordering::Less,
            (GroupKey::Text(_), GroupKey::Number(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(v) => write!(f, "{v}"),
            GroupKey::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::Text(value.to_string())
    }
}

/// Names of the columns a curve operation reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveColumns {
    pub x: String,
    pub y: String,
    pub group: Option<String>,
}

impl CurveColumns {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            group: None,
        }
    }

    pub fn grouped_by(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Check that x and y exist and are numeric, and that the group column exists.
    pub fn validate(&self, table: &Table) -> Result<()> {
        table.numeric(&self.x)?;
        table.numeric(&self.y)?;
        if let Some(group) = &self.group {
            table.column(group)?;
        }
        Ok(())
    }
}

/// An ordered set of equally long named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from `(name, column)` pairs.
    ///
    /// Fails when column lengths differ or a name repeats.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut table = Table::default();
        for (i, (name, column)) in columns.into_iter().enumerate() {
            if i > 0 && column.len() != table.n_rows {
                return Err(FermError::length_mismatch(table.n_rows, column.len()));
            }
            if table.names.contains(&name) {
                return Err(FermError::invalid_parameter(format!("Duplicate column name `{name}`")));
            }
            table.n_rows = column.len();
            table.names.push(name);
            table.columns.push(column);
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| FermError::missing_column(name))
    }

    /// Numeric column by name.
    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        self.column(name)?.as_numeric().ok_or_else(|| FermError::ColumnType {
            column: name.to_string(),
            expected: "numeric",
        })
    }

    /// Copy of this table with `column` added at the end, or replacing an
    /// existing column of the same name in place.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Table> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(FermError::length_mismatch(self.n_rows, column.len()));
        }
        let mut out = self.clone();
        out.n_rows = column.len();
        match out.names.iter().position(|n| *n == name) {
            Some(i) => out.columns[i] = column,
            None => {
                out.names.push(name);
                out.columns.push(column);
            }
        }
        Ok(out)
    }

    /// Rows gathered by index, all columns kept.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// Stack tables with identical schemas (same names, same column kinds, same order).
    pub fn concat(tables: &[Table]) -> Result<Table> {
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };
        let mut out = first.clone();
        for table in &tables[1..] {
            if table.names != out.names {
                return Err(FermError::invalid_parameter(format!(
                    "Cannot concatenate tables with columns [{}] and [{}]",
                    out.names.join(", "),
                    table.names.join(", ")
                )));
            }
            for (i, column) in table.columns.iter().enumerate() {
                let kind = out.columns[i].kind();
                if !out.columns[i].append(column) {
                    return Err(FermError::ColumnType {
                        column: out.names[i].clone(),
                        expected: kind,
                    });
                }
            }
            out.n_rows += table.n_rows;
        }
        Ok(out)
    }
}
