//! Partition set backed by an object store.
//!
//! Partitions live in an [`ObjectStore`] and the set keeps only a
//! [`PartitionRef`] handle and cached [`PartitionMetadata`] per index, so
//! row counts are answered without fetching partitions.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use common_error::{TesselError, TesselResult};
use tessel_core::PartId;

use super::PartitionSet;
use crate::partition::VPartition;

/// Handle to a partition held by an object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionRef(u64);

impl PartitionRef {
    /// Get the raw handle.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PartitionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ref-{}", self.0)
    }
}

/// Summary of a stored partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionMetadata {
    /// Number of rows.
    pub num_rows: usize,
    /// Approximate size of the values in bytes.
    pub size_bytes: usize,
}

impl PartitionMetadata {
    /// Metadata describing `part`.
    pub fn from_partition(part: &VPartition) -> Self {
        Self {
            num_rows: part.len(),
            size_bytes: part.size_bytes(),
        }
    }
}

/// Storage for partitions addressed by reference.
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Store a partition and return its handle.
    fn put(&self, part: VPartition) -> TesselResult<PartitionRef>;

    /// Fetch a stored partition.
    fn get(&self, handle: PartitionRef) -> TesselResult<VPartition>;

    /// Drop a stored partition.
    fn delete(&self, handle: PartitionRef) -> TesselResult<()>;
}

/// Object store living in process memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    next_ref: AtomicU64,
    objects: RwLock<HashMap<PartitionRef, VPartition>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn num_objects(&self) -> TesselResult<usize> {
        Ok(self.read()?.len())
    }

    fn read(
        &self,
    ) -> TesselResult<std::sync::RwLockReadGuard<'_, HashMap<PartitionRef, VPartition>>> {
        self.objects
            .read()
            .map_err(|_| TesselError::internal("object store lock poisoned"))
    }

    fn write(
        &self,
    ) -> TesselResult<std::sync::RwLockWriteGuard<'_, HashMap<PartitionRef, VPartition>>> {
        self.objects
            .write()
            .map_err(|_| TesselError::internal("object store lock poisoned"))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, part: VPartition) -> TesselResult<PartitionRef> {
        let handle = PartitionRef(self.next_ref.fetch_add(1, Ordering::Relaxed));
        self.write()?.insert(handle, part);
        Ok(handle)
    }

    fn get(&self, handle: PartitionRef) -> TesselResult<VPartition> {
        self.read()?
            .get(&handle)
            .cloned()
            .ok_or_else(|| TesselError::not_found(format!("object {handle} not found")))
    }

    fn delete(&self, handle: PartitionRef) -> TesselResult<()> {
        self.write()?
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| TesselError::not_found(format!("object {handle} not found")))
    }
}

/// Partition set whose partitions live in an object store.
#[derive(Debug)]
pub struct ObjectStorePartitionSet {
    store: Arc<dyn ObjectStore>,
    refs: BTreeMap<PartId, (PartitionRef, PartitionMetadata)>,
}

impl ObjectStorePartitionSet {
    /// Create an empty set over `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            refs: BTreeMap::new(),
        }
    }

    /// Handle of the partition under `idx`.
    pub fn partition_ref(&self, idx: PartId) -> Option<PartitionRef> {
        self.refs.get(&idx).map(|(handle, _)| *handle)
    }

    /// Cached metadata of the partition under `idx`.
    pub fn metadata(&self, idx: PartId) -> Option<PartitionMetadata> {
        self.refs.get(&idx).map(|(_, meta)| *meta)
    }
}

impl PartitionSet for ObjectStorePartitionSet {
    fn get_partition(&self, idx: PartId) -> TesselResult<VPartition> {
        let handle = self
            .partition_ref(idx)
            .ok_or_else(|| TesselError::not_found(format!("partition {idx} not found")))?;
        self.store.get(handle)
    }

    fn set_partition(&mut self, idx: PartId, part: VPartition) -> TesselResult<()> {
        let meta = PartitionMetadata::from_partition(&part);
        let handle = self.store.put(part)?;
        if let Some((old, _)) = self.refs.insert(idx, (handle, meta)) {
            self.store.delete(old)?;
        }
        log::trace!("partition {idx} stored as {handle} ({} rows)", meta.num_rows);
        Ok(())
    }

    fn delete_partition(&mut self, idx: PartId) -> TesselResult<()> {
        let (handle, _) = self
            .refs
            .remove(&idx)
            .ok_or_else(|| TesselError::not_found(format!("partition {idx} not found")))?;
        self.store.delete(handle)
    }

    fn has_partition(&self, idx: PartId) -> bool {
        self.refs.contains_key(&idx)
    }

    fn len_of_partitions(&self) -> Vec<usize> {
        self.refs.values().map(|(_, meta)| meta.num_rows).collect()
    }

    fn num_partitions(&self) -> usize {
        self.refs.len()
    }

    fn partition_ids(&self) -> Vec<PartId> {
        self.refs.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryObjectStore::new();
        let a = store.put(VPartition::empty(0)).unwrap();
        let b = store.put(VPartition::empty(1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get(b).unwrap().partition_id(), 1);
        store.delete(a).unwrap();
        assert!(store.get(a).is_err());
        assert!(store.delete(a).is_err());
        assert_eq!(store.num_objects().unwrap(), 1);
    }

    #[test]
    fn test_overwrite_releases_old_object() {
        let store = Arc::new(MemoryObjectStore::new());
        let mut set = ObjectStorePartitionSet::new(store.clone());
        set.set_partition(0, VPartition::empty(0)).unwrap();
        let first = set.partition_ref(0).unwrap();
        set.set_partition(0, VPartition::empty(0)).unwrap();

        assert_ne!(set.partition_ref(0).unwrap(), first);
        assert_eq!(store.num_objects().unwrap(), 1);
        assert_eq!(set.metadata(0).unwrap().num_rows, 0);

        set.delete_partition(0).unwrap();
        assert!(set.is_empty());
        assert_eq!(store.num_objects().unwrap(), 0);
    }
}
