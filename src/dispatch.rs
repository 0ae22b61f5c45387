//! Group dispatcher: split a table by group key, run a transform on every
//! group independently, and put the results back together.
//!
//! Partitions are always produced in ascending key order and every partition
//! is sorted by x (stable, NaN last) before a transform sees it. Transforms run
//! on rayon's pool, but results are collected in partition order, so the output
//! never depends on scheduling.

use std::collections::BTreeMap;

use log::{debug, warn};
use rayon::prelude::*;

use crate::domain::{GroupKey, Table};
use crate::error::Result;
use crate::methods::sort_order;

/// One group's rows, sorted by x.
#[derive(Debug, Clone)]
pub struct Partition {
    /// `None` when the table is not grouped.
    pub key: Option<GroupKey>,
    pub table: Table,
}

/// The result of running a transform on one partition.
#[derive(Debug)]
pub struct GroupOutcome {
    pub key: Option<GroupKey>,
    pub result: Result<Table>,
}

/// Split `table` by the `group` column (or not at all), sorting each part by `x`.
pub fn partition(table: &Table, x: &str, group: Option<&str>) -> Result<Vec<Partition>> {
    let xs = table.numeric(x)?;

    let Some(group) = group else {
        return Ok(vec![Partition {
            key: None,
            table: table.take(&sort_order(xs)),
        }]);
    };

    let keys = table.column(group)?;
    if table.n_rows() == 0 {
        return Ok(vec![Partition {
            key: None,
            table: table.clone(),
        }]);
    }

    let mut rows: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for i in 0..table.n_rows() {
        rows.entry(keys.key_at(i)).or_default().push(i);
    }

    let partitions: Vec<Partition> = rows
        .into_iter()
        .map(|(key, indices)| {
            let group_x: Vec<f64> = indices.iter().map(|&i| xs[i]).collect();
            let sorted: Vec<usize> = sort_order(&group_x).into_iter().map(|j| indices[j]).collect();
            Partition {
                key: Some(key),
                table: table.take(&sorted),
            }
        })
        .collect();

    debug!(
        "dispatch: {} rows split into {} groups by `{group}`",
        table.n_rows(),
        partitions.len()
    );
    Ok(partitions)
}

/// Run `f` on every partition in parallel; outcomes come back in partition order.
pub fn map_partitions<F>(partitions: &[Partition], f: F) -> Vec<GroupOutcome>
where
    F: Fn(&Partition) -> Result<Table> + Sync + Send,
{
    partitions
        .par_iter()
        .map(|part| GroupOutcome {
            key: part.key.clone(),
            result: f(part),
        })
        .collect()
}

/// Partition `table` and run `f` on each group, keeping every group's result.
pub fn apply_each<F>(table: &Table, x: &str, group: Option<&str>, f: F) -> Result<Vec<GroupOutcome>>
where
    F: Fn(&Partition) -> Result<Table> + Sync + Send,
{
    let partitions = partition(table, x, group)?;
    Ok(map_partitions(&partitions, f))
}

/// Fail-fast form of [`apply_each`]: the first failing group (in key order)
/// aborts the whole call.
pub fn apply<F>(table: &Table, x: &str, group: Option<&str>, f: F) -> Result<Table>
where
    F: Fn(&Partition) -> Result<Table> + Sync + Send,
{
    collect(apply_each(table, x, group, f)?, false)
}

/// Concatenate group outcomes in order.
///
/// Errors carry their group key. With `skip_failed`, failing groups are logged
/// and left out instead.
pub fn collect(outcomes: Vec<GroupOutcome>, skip_failed: bool) -> Result<Table> {
    let mut tables = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match (outcome.result, outcome.key) {
            (Ok(table), _) => tables.push(table),
            (Err(err), Some(key)) if skip_failed => warn!("skipping group `{key}`: {err}"),
            (Err(err), None) if skip_failed => warn!("skipping table: {err}"),
            (Err(err), Some(key)) => return Err(err.in_group(key)),
            (Err(err), None) => return Err(err),
        }
    }
    Table::concat(&tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;
    use crate::error::FermError;

    fn table() -> Table {
        Table::from_columns(vec![
            (
                "sample_id".to_string(),
                Column::Text(vec!["b".into(), "a".into(), "b".into(), "a".into(), "b".into()]),
            ),
            ("time".to_string(), Column::Numeric(vec![2.0, 1.0, 0.0, 0.0, 1.0])),
            ("value".to_string(), Column::Numeric(vec![20.0, 11.0, 0.0, 10.0, 10.0])),
        ])
        .unwrap()
    }

    #[test]
    fn partitions_are_key_ordered_and_x_sorted() {
        let parts = partition(&table(), "time", Some("sample_id")).unwrap();
        let keys: Vec<_> = parts.iter().map(|p| p.key.clone()).collect();
        assert_eq!(keys, vec![Some(GroupKey::from("a")), Some(GroupKey::from("b"))]);
        assert_eq!(parts[0].table.numeric("time").unwrap(), &[0.0, 1.0]);
        assert_eq!(parts[1].table.numeric("value").unwrap(), &[0.0, 10.0, 20.0]);
    }

    #[test]
    fn ungrouped_table_is_one_sorted_partition() {
        let parts = partition(&table(), "time", None).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].key.is_none());
        assert_eq!(parts[0].table.numeric("time").unwrap(), &[0.0, 0.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn empty_table_is_one_empty_partition() {
        let empty = table().take(&[]);
        let parts = partition(&empty, "time", Some("sample_id")).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].table.n_rows(), 0);
    }

    #[test]
    fn apply_concatenates_in_key_order() {
        let out = apply(&table(), "time", Some("sample_id"), |p| Ok(p.table.clone())).unwrap();
        assert_eq!(out.n_rows(), 5);
        assert_eq!(out.numeric("value").unwrap(), &[10.0, 11.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn first_failure_is_reported_with_its_key() {
        let err = apply(&table(), "time", Some("sample_id"), |p| {
            if p.table.n_rows() < 3 {
                Err(FermError::insufficient_data("test", 3, p.table.n_rows()))
            } else {
                Ok(p.table.clone())
            }
        })
        .unwrap_err();
        match err {
            FermError::Group { key, .. } => assert_eq!(key, GroupKey::from("a")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn skip_failed_keeps_the_good_groups() {
        let outcomes = apply_each(&table(), "time", Some("sample_id"), |p| {
            if p.key == Some(GroupKey::from("a")) {
                Err(FermError::invalid_parameter("boom"))
            } else {
                Ok(p.table.clone())
            }
        })
        .unwrap();
        assert_eq!(outcomes.len(), 2);
        let out = collect(outcomes, true).unwrap();
        assert_eq!(out.n_rows(), 3);
    }

    #[test]
    fn missing_group_column_is_reported() {
        assert!(matches!(
            partition(&table(), "time", Some("batch")),
            Err(FermError::MissingColumn { .. })
        ));
    }
}
