//! Unit tests for common-config crate

use common_config::{
    ExecutionConfig, PartitionSetBackend, PartitioningConfig, TesselConfig,
    DEFAULT_NUM_PARTITIONS,
};

#[test]
fn test_tessel_config_default() {
    let config = TesselConfig::default();

    assert_eq!(config.execution.default_num_partitions, DEFAULT_NUM_PARTITIONS);
    assert_eq!(config.execution.sample_seed, None);

    assert_eq!(config.partitioning.backend, PartitionSetBackend::InMemory);
}

#[test]
fn test_backend_default() {
    assert_eq!(PartitionSetBackend::default(), PartitionSetBackend::InMemory);
    assert_ne!(PartitionSetBackend::InMemory, PartitionSetBackend::ObjectStore);
}

#[test]
fn test_tessel_config_serialization() {
    let mut config = TesselConfig::default();
    config.execution.default_num_partitions = 4;
    config.execution.sample_seed = Some(42);
    config.partitioning.backend = PartitionSetBackend::ObjectStore;

    let json = config.to_json_string().unwrap();
    let deserialized = TesselConfig::from_json_str(&json).unwrap();

    assert_eq!(deserialized.execution.default_num_partitions, 4);
    assert_eq!(deserialized.execution.sample_seed, Some(42));
    assert_eq!(
        deserialized.partitioning.backend,
        PartitionSetBackend::ObjectStore
    );
}

#[test]
fn test_partial_json_uses_defaults() {
    let config =
        TesselConfig::from_json_str(r#"{"partitioning": {"backend": "ObjectStore"}}"#).unwrap();

    assert_eq!(config.partitioning.backend, PartitionSetBackend::ObjectStore);
    assert_eq!(config.execution.default_num_partitions, DEFAULT_NUM_PARTITIONS);
}

#[test]
fn test_empty_json_is_default() {
    let config = TesselConfig::from_json_str("{}").unwrap();
    assert_eq!(config.partitioning.backend, PartitionSetBackend::InMemory);
    assert_eq!(config.execution.sample_seed, None);
}

#[test]
fn test_invalid_json_is_error() {
    assert!(TesselConfig::from_json_str("{ not json").is_err());
    assert!(TesselConfig::from_json_str(r#"{"partitioning": {"backend": "Ray"}}"#).is_err());
}

#[test]
fn test_execution_config_serialization() {
    let config = ExecutionConfig {
        default_num_partitions: 16,
        sample_seed: Some(7),
    };

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("16"));

    let deserialized: ExecutionConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.default_num_partitions, 16);
    assert_eq!(deserialized.sample_seed, Some(7));
}

#[test]
fn test_partitioning_config_debug_format() {
    let config = PartitioningConfig {
        backend: PartitionSetBackend::ObjectStore,
    };
    let debug_str = format!("{:?}", config);
    assert!(debug_str.contains("ObjectStore"));
}

#[test]
fn test_config_clone() {
    let mut config = TesselConfig::default();
    config.execution.default_num_partitions = 2;

    let cloned = config.clone();
    assert_eq!(
        cloned.execution.default_num_partitions,
        config.execution.default_num_partitions
    );
}
