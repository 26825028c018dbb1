//! Configuration management for Tessel.
//!
//! Provides session configuration for partition execution and the
//! partition-set backend used by the partition manager.

use serde::{Deserialize, Serialize};

use common_error::TesselResult;

/// Default number of partitions used when a plan does not specify one.
pub const DEFAULT_NUM_PARTITIONS: usize = 8;

/// Global Tessel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TesselConfig {
    /// Execution configuration.
    pub execution: ExecutionConfig,
    /// Partitioning configuration.
    pub partitioning: PartitioningConfig,
}

impl TesselConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> TesselResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this configuration to JSON.
    pub fn to_json_string(&self) -> TesselResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Partition execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Number of partitions for `PartitionManager::repartition` when none is
    /// given.
    pub default_num_partitions: usize,
    /// Seed for `PartitionManager::sample`. `None` draws fresh entropy.
    pub sample_seed: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_num_partitions: DEFAULT_NUM_PARTITIONS,
            sample_seed: None,
        }
    }
}

/// Backend used to store the partitions of one logical dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PartitionSetBackend {
    /// Partitions held directly in process memory.
    #[default]
    InMemory,
    /// Partitions held in an object store and addressed by reference.
    ObjectStore,
}

/// Partitioning configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningConfig {
    /// Backend for new partition sets.
    pub backend: PartitionSetBackend,
}
