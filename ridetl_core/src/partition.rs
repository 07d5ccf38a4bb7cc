//! The partition / apply / combine executor that all the per-segment work is
//! built on.

use std::collections::BTreeMap;

use anyhow::Result;
use log::debug;
use rayon::prelude::*;

/// Splits `rows` into partitions by `partition_by`, applies `transform` to
/// each partition independently, then concatenates the results and sorts them
/// by `order_by`.
///
/// Within a partition the rows keep their input order. The transform only ever
/// sees its own partition and may add, change or drop rows. Partitions are
/// processed in parallel; the combine step waits for all of them.
///
/// If the transform fails for any partition the error is returned and the
/// output of every other partition is thrown away.
pub fn apply_partitioned<T, U, K, O, P, S, F>(
    rows: Vec<T>,
    partition_by: P,
    order_by: S,
    transform: F,
) -> Result<Vec<U>>
where
    T: Send,
    U: Send,
    K: Ord,
    O: Ord,
    P: Fn(&T) -> K,
    S: Fn(&U) -> O,
    F: Fn(Vec<T>) -> Result<Vec<U>> + Send + Sync,
{
    let partitions = partition(rows, partition_by);
    debug!("apply_partitioned: {} partitions", partitions.len());

    let transformed = partitions
        .into_par_iter()
        .map(&transform)
        .collect::<Result<Vec<Vec<U>>>>()?;

    let mut combined: Vec<U> = transformed.into_iter().flatten().collect();
    combined.sort_by_key(|row| order_by(row));
    Ok(combined)
}

/// Groups the rows by key. Every row lands in exactly one partition, and the
/// partitions come back in key order.
fn partition<T, K, P>(rows: Vec<T>, partition_by: P) -> Vec<Vec<T>>
where
    K: Ord,
    P: Fn(&T) -> K,
{
    let mut partitions: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for row in rows {
        partitions.entry(partition_by(&row)).or_default().push(row);
    }

    partitions.into_values().collect()
}
