//! In-process partition set.

use std::collections::BTreeMap;

use common_error::{TesselError, TesselResult};
use tessel_core::PartId;

use super::PartitionSet;
use crate::partition::VPartition;

/// Partitions held directly in memory.
#[derive(Debug, Clone, Default)]
pub struct LocalPartitionSet {
    partitions: BTreeMap<PartId, VPartition>,
}

impl LocalPartitionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from partitions, keyed by their own partition ids.
    pub fn from_partitions(parts: impl IntoIterator<Item = VPartition>) -> Self {
        Self {
            partitions: parts
                .into_iter()
                .map(|p| (p.partition_id(), p))
                .collect(),
        }
    }
}

impl PartitionSet for LocalPartitionSet {
    fn get_partition(&self, idx: PartId) -> TesselResult<VPartition> {
        self.partitions
            .get(&idx)
            .cloned()
            .ok_or_else(|| TesselError::not_found(format!("partition {idx} not found")))
    }

    fn set_partition(&mut self, idx: PartId, part: VPartition) -> TesselResult<()> {
        self.partitions.insert(idx, part);
        Ok(())
    }

    fn delete_partition(&mut self, idx: PartId) -> TesselResult<()> {
        self.partitions
            .remove(&idx)
            .map(|_| ())
            .ok_or_else(|| TesselError::not_found(format!("partition {idx} not found")))
    }

    fn has_partition(&self, idx: PartId) -> bool {
        self.partitions.contains_key(&idx)
    }

    fn len_of_partitions(&self) -> Vec<usize> {
        self.partitions.values().map(VPartition::len).collect()
    }

    fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    fn partition_ids(&self) -> Vec<PartId> {
        self.partitions.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut set = LocalPartitionSet::new();
        assert!(set.is_empty());
        set.set_partition(1, VPartition::empty(1)).unwrap();
        set.set_partition(0, VPartition::empty(0)).unwrap();

        assert!(set.has_partition(1));
        assert_eq!(set.num_partitions(), 2);
        assert_eq!(set.partition_ids(), vec![0, 1]);
        assert_eq!(set.get_partition(1).unwrap().partition_id(), 1);

        set.delete_partition(1).unwrap();
        assert!(!set.has_partition(1));
        assert!(matches!(
            set.delete_partition(1),
            Err(TesselError::NotFound(_))
        ));
        assert!(set.get_partition(5).is_err());
    }
}
