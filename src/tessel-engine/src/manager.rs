//! Registry of partition sets by plan node.

use std::collections::HashMap;
use std::sync::Arc;

use common_config::{PartitionSetBackend, TesselConfig};
use common_error::{TesselError, TesselResult};
use tessel_core::{NodeId, PartId};
use tessel_logical::ExpressionList;

use crate::partition::VPartition;
use crate::partition_set::{
    LocalPartitionSet, MemoryObjectStore, ObjectStorePartitionSet, PartitionSet,
};
use crate::shuffle::hash_repartition;

/// Produces empty partition sets of the configured backend.
pub type PartitionSetFactory = Box<dyn Fn() -> Box<dyn PartitionSet> + Send + Sync>;

/// Maps plan nodes to their materialized partition sets.
///
/// One manager is created per session and passed to whatever needs it. It
/// takes `&mut self` for every mutation and does no locking of its own;
/// callers sharing it across threads wrap the whole manager in a lock.
/// Reads never create entries. The session configuration supplies defaults
/// for repartitioning and sampling.
pub struct PartitionManager {
    config: TesselConfig,
    factory: PartitionSetFactory,
    sets: HashMap<NodeId, Box<dyn PartitionSet>>,
}

impl std::fmt::Debug for PartitionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut nodes: Vec<&NodeId> = self.sets.keys().collect();
        nodes.sort_unstable();
        f.debug_struct("PartitionManager")
            .field("config", &self.config)
            .field("nodes", &nodes)
            .finish_non_exhaustive()
    }
}

impl PartitionManager {
    /// Create a manager that builds new sets with `factory`.
    pub fn new(factory: PartitionSetFactory) -> Self {
        Self::with_config(TesselConfig::default(), factory)
    }

    fn with_config(config: TesselConfig, factory: PartitionSetFactory) -> Self {
        Self {
            config,
            factory,
            sets: HashMap::new(),
        }
    }

    /// Create a manager whose sets keep partitions in memory.
    pub fn in_memory() -> Self {
        Self::new(Box::new(|| -> Box<dyn PartitionSet> {
            Box::new(LocalPartitionSet::new())
        }))
    }

    /// Create a manager for the backend named in `config`.
    ///
    /// The object-store backend shares one in-process store between every
    /// set this manager creates.
    pub fn from_config(config: &TesselConfig) -> Self {
        let factory: PartitionSetFactory = match config.partitioning.backend {
            PartitionSetBackend::InMemory => Box::new(|| -> Box<dyn PartitionSet> {
                Box::new(LocalPartitionSet::new())
            }),
            PartitionSetBackend::ObjectStore => {
                let store = Arc::new(MemoryObjectStore::new());
                Box::new(move || -> Box<dyn PartitionSet> {
                    Box::new(ObjectStorePartitionSet::new(store.clone()))
                })
            }
        };
        Self::with_config(config.clone(), factory)
    }

    /// The session configuration.
    pub fn config(&self) -> &TesselConfig {
        &self.config
    }

    /// A new, empty set from the configured factory. Not registered.
    pub fn new_partition_set(&self) -> Box<dyn PartitionSet> {
        (self.factory)()
    }

    /// The set registered for `node`.
    pub fn get_partition_set(&self, node: NodeId) -> TesselResult<&dyn PartitionSet> {
        self.sets
            .get(&node)
            .map(|set| set.as_ref())
            .ok_or_else(|| TesselError::not_found(format!("no partition set for node {node}")))
    }

    /// Mutable access to the set registered for `node`.
    pub fn get_partition_set_mut(&mut self, node: NodeId) -> TesselResult<&mut dyn PartitionSet> {
        match self.sets.get_mut(&node) {
            Some(set) => Ok(set.as_mut()),
            None => Err(TesselError::not_found(format!(
                "no partition set for node {node}"
            ))),
        }
    }

    /// Register `set` for `node`, replacing any previous one.
    pub fn put_partition_set(&mut self, node: NodeId, set: Box<dyn PartitionSet>) {
        log::debug!(
            "registering {} partitions for node {node}",
            set.num_partitions()
        );
        self.sets.insert(node, set);
    }

    /// Remove one partition of `node`, or its whole set.
    ///
    /// Removing the last partition of a set also drops the node's entry.
    pub fn rm(&mut self, node: NodeId, partition_id: Option<PartId>) -> TesselResult<()> {
        match partition_id {
            None => {
                self.sets.remove(&node).ok_or_else(|| {
                    TesselError::not_found(format!("no partition set for node {node}"))
                })?;
                log::debug!("removed partition set of node {node}");
            }
            Some(pid) => {
                let set = self.get_partition_set_mut(node)?;
                set.delete_partition(pid)?;
                log::debug!("removed partition {pid} of node {node}");
                if set.is_empty() {
                    self.sets.remove(&node);
                    log::debug!("node {node} has no partitions left");
                }
            }
        }
        Ok(())
    }

    /// Hash-repartition the set of `source` on `keys` and register the result
    /// under `target`.
    ///
    /// `num_partitions` defaults to the configured partition count. Source
    /// partitions are read in index order.
    pub fn repartition(
        &mut self,
        source: NodeId,
        target: NodeId,
        keys: &ExpressionList,
        num_partitions: Option<usize>,
    ) -> TesselResult<()> {
        let n = num_partitions.unwrap_or(self.config.execution.default_num_partitions);
        let inputs = {
            let set = self.get_partition_set(source)?;
            set.partition_ids()
                .into_iter()
                .map(|pid| set.get_partition(pid))
                .collect::<TesselResult<Vec<_>>>()?
        };
        let mut out = self.new_partition_set();
        for part in hash_repartition(&inputs, keys, n)? {
            out.set_partition(part.partition_id(), part)?;
        }
        log::debug!("node {source} repartitioned into {n} partitions as node {target}");
        self.put_partition_set(target, out);
        Ok(())
    }

    /// Draw `n` rows from one partition of `node`, seeded from the
    /// configuration.
    pub fn sample(&self, node: NodeId, partition_id: PartId, n: usize) -> TesselResult<VPartition> {
        self.get_partition_set(node)?
            .get_partition(partition_id)?
            .sample(n, self.config.execution.sample_seed)
    }

    /// Drop every registered set.
    pub fn clear(&mut self) {
        log::debug!("clearing {} partition sets", self.sets.len());
        self.sets.clear();
    }

    /// Whether `node` has a registered set.
    pub fn contains(&self, node: NodeId) -> bool {
        self.sets.contains_key(&node)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl Default for PartitionManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(manager: &PartitionManager, pids: &[PartId]) -> Box<dyn PartitionSet> {
        let mut set = manager.new_partition_set();
        for &pid in pids {
            set.set_partition(pid, VPartition::empty(pid)).unwrap();
        }
        set
    }

    #[test]
    fn test_reads_do_not_create_entries() {
        let manager = PartitionManager::in_memory();
        assert!(matches!(
            manager.get_partition_set(7),
            Err(TesselError::NotFound(_))
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_rm_last_partition_drops_node() {
        let mut manager = PartitionManager::in_memory();
        let set = set_with(&manager, &[0, 1]);
        manager.put_partition_set(3, set);

        manager.rm(3, Some(0)).unwrap();
        assert!(manager.contains(3));
        assert_eq!(manager.get_partition_set(3).unwrap().partition_ids(), vec![1]);

        manager.rm(3, Some(1)).unwrap();
        assert!(!manager.contains(3));
        assert!(manager.rm(3, None).is_err());
    }

    #[test]
    fn test_rm_whole_node_and_clear() {
        let mut manager = PartitionManager::default();
        manager.put_partition_set(1, set_with(&manager, &[0]));
        manager.put_partition_set(2, set_with(&manager, &[0]));
        manager.rm(1, None).unwrap();
        assert_eq!(manager.len(), 1);
        manager.clear();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_put_overwrites() {
        let mut manager = PartitionManager::in_memory();
        manager.put_partition_set(1, set_with(&manager, &[0, 1, 2]));
        manager.put_partition_set(1, set_with(&manager, &[5]));
        assert_eq!(manager.get_partition_set(1).unwrap().partition_ids(), vec![5]);
    }

    #[test]
    fn test_repartition_of_missing_node() {
        let mut manager = PartitionManager::in_memory();
        let err = manager
            .repartition(1, 2, &ExpressionList::empty(), None)
            .unwrap_err();
        assert!(matches!(err, TesselError::NotFound(_)));
        assert!(!manager.contains(2));
    }

    #[test]
    fn test_from_config_object_store() {
        let config =
            TesselConfig::from_json_str(r#"{"partitioning": {"backend": "ObjectStore"}}"#).unwrap();
        let mut manager = PartitionManager::from_config(&config);
        manager.put_partition_set(9, set_with(&manager, &[0, 1]));
        let set = manager.get_partition_set(9).unwrap();
        assert_eq!(set.len_of_partitions(), vec![0, 0]);
        assert!(format!("{manager:?}").contains("PartitionManager"));
    }
}
