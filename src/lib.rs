//! Tessel - partitioned, column-oriented execution substrate
//!
//! Tessel provides the pieces a dataframe engine's scheduler composes to run
//! a plan over many partitions: resolved expression lists, column tiles,
//! partitions with local and shuffle operators, and partition-set addressing.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_error as error;
pub use tessel_core as core;
pub use tessel_engine as engine;
pub use tessel_logical as logical;

pub use common_config::TesselConfig;
pub use common_error::{TesselError, TesselResult};
pub use tessel_core::{ColumnId, DataType, NodeId, PartId, ResourceRequest, Value};
pub use tessel_engine::{
    DataBlock, JoinType, PartitionManager, PartitionSet, PyListTile, VPartition,
};
pub use tessel_logical::{col, lit, AggOp, Expression, ExpressionList};

/// Tessel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
