//! Partition execution layer for Tessel.
//!
//! This crate holds the data side of query execution: column blocks, the
//! tiles and partitions built from them, and the partition sets a scheduler
//! uses to address materialized plan outputs.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // Hash buckets and means cast on purpose
#![allow(clippy::module_name_repetitions)]
//!
//! # Key Components
//!
//! ## Blocks ([`block`])
//!
//! A [`DataBlock`] is one column's values. Vectorizable values live in an
//! Arrow array, anything else in a generic value list; both honor the same
//! operators (take, filter, argsort, hash, split, merge, aggregate, join).
//!
//! ## Partitions
//!
//! - [`PyListTile`]: one column of one partition, tagged with its identity
//! - [`VPartition`]: equal-length tiles keyed by column identity; projection,
//!   filtering, sorting, aggregation, shuffle split and merge, and join
//!
//! ## Addressing
//!
//! - [`PartitionSet`]: partitions of one dataset, with an in-memory and an
//!   object-store backend
//! - [`PartitionManager`]: plan node to partition set registry
//!
//! # Shuffle
//!
//! ```text
//! source 0 ──split_by_hash──▶ [f0, f1, f2] ─┐
//! source 1 ──split_by_hash──▶ [f0, f1, f2] ─┼─ merge_partitions(fi) ──▶ target i
//! source 2 ──split_by_hash──▶ [f0, f1, f2] ─┘
//! ```

pub mod block;
pub mod expr;
pub mod manager;
pub mod partition;
pub mod partition_set;
pub mod shuffle;
pub mod tile;

pub use block::DataBlock;
pub use expr::ExprEvaluator;
pub use manager::{PartitionManager, PartitionSetFactory};
pub use partition::{JoinType, VPartition};
pub use partition_set::{
    LocalPartitionSet, MemoryObjectStore, ObjectStore, ObjectStorePartitionSet,
    PartitionMetadata, PartitionRef, PartitionSet,
};
pub use shuffle::hash_repartition;
pub use tile::PyListTile;
