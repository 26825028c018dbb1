//! In-process hash shuffle.
//!
//! A shuffle has a write side (every source partition is split into `n`
//! fragments by key hash) and a read side (fragment `i` of every source is
//! merged into output partition `i`). A distributed scheduler runs the two
//! sides on different workers; [`hash_repartition`] runs both in place.

use common_error::{ensure, TesselResult};
use tessel_logical::ExpressionList;

use crate::partition::VPartition;

/// Redistribute rows of `partitions` into `n` partitions by the hash of
/// `keys`.
///
/// Output partition `i` holds, in source order, every row whose key hashes to
/// bucket `i`.
pub fn hash_repartition(
    partitions: &[VPartition],
    keys: &ExpressionList,
    n: usize,
) -> TesselResult<Vec<VPartition>> {
    ensure!(
        !partitions.is_empty(),
        ValueError: "cannot repartition zero partitions"
    );

    let mut buckets: Vec<Vec<VPartition>> = (0..n).map(|_| Vec::new()).collect();
    for part in partitions {
        for (bucket, fragment) in buckets.iter_mut().zip(part.split_by_hash(keys, n)?) {
            bucket.push(fragment);
        }
    }

    let merged = buckets
        .into_iter()
        .map(|fragments| VPartition::merge_partitions(fragments, true))
        .collect::<TesselResult<Vec<_>>>()?;
    log::debug!(
        "repartitioned {} partitions into {} on {}",
        partitions.len(),
        n,
        keys
    );
    Ok(merged)
}
