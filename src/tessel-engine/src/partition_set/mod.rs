//! Collections of partitions belonging to one logical dataset.
//!
//! [`PartitionSet`] is the addressing contract the scheduler uses to find the
//! partitions of a plan node. Two backends implement it:
//!
//! - [`LocalPartitionSet`] keeps partitions directly in process memory.
//! - [`ObjectStorePartitionSet`] keeps references into an [`ObjectStore`]
//!   plus cached per-partition metadata.

mod local;
mod object_store;

pub use local::LocalPartitionSet;
pub use object_store::{
    MemoryObjectStore, ObjectStore, ObjectStorePartitionSet, PartitionMetadata, PartitionRef,
};

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;

use common_error::{TesselError, TesselResult};
use tessel_core::PartId;
use tessel_logical::ExpressionList;

use crate::partition::VPartition;

/// A pluggable collection of partitions indexed by partition id.
///
/// `set_partition` is the only way to add or replace an entry, and
/// `delete_partition` removes exactly one.
pub trait PartitionSet: Send + Sync + std::fmt::Debug {
    /// The partition stored under `idx`.
    fn get_partition(&self, idx: PartId) -> TesselResult<VPartition>;

    /// Store `part` under `idx`, replacing any previous entry.
    fn set_partition(&mut self, idx: PartId, part: VPartition) -> TesselResult<()>;

    /// Remove the partition under `idx`. Fails if there is none.
    fn delete_partition(&mut self, idx: PartId) -> TesselResult<()>;

    /// Whether a partition is stored under `idx`.
    fn has_partition(&self, idx: PartId) -> bool;

    /// Row count of every partition, in partition id order.
    fn len_of_partitions(&self) -> Vec<usize>;

    /// Number of stored partitions.
    fn num_partitions(&self) -> usize;

    /// Stored partition ids in ascending order.
    fn partition_ids(&self) -> Vec<PartId>;

    /// Total number of rows.
    fn len(&self) -> usize {
        self.len_of_partitions().iter().sum()
    }

    /// Whether the set holds no partitions.
    fn is_empty(&self) -> bool {
        self.num_partitions() == 0
    }

    /// Concatenate every partition, in partition id order, into one batch
    /// laid out by `schema`.
    fn to_record_batch(&self, schema: &ExpressionList) -> TesselResult<RecordBatch> {
        let batches = self
            .partition_ids()
            .into_iter()
            .map(|idx| self.get_partition(idx)?.to_record_batch(Some(schema)))
            .collect::<TesselResult<Vec<_>>>()?;
        let Some(first) = batches.first() else {
            return Err(TesselError::value_error(
                "cannot build a table from an empty partition set",
            ));
        };
        Ok(concat_batches(&first.schema(), &batches)?)
    }
}
