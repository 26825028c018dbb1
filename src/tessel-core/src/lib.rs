//! Core data model for Tessel.
//!
//! This crate provides the fundamental types shared by the expression and
//! partition layers:
//! - `Value` and `DataType` for the type system
//! - `ColumnId`, `PartId` and `NodeId` identities
//! - `ResourceRequest` for sizing execution slots

pub mod ids;
pub mod resource;
pub mod types;

mod proptest_utils;

// Re-export commonly used types
pub use ids::{ColumnId, NodeId, PartId};
pub use resource::ResourceRequest;
pub use types::{DataType, Value, ValueKey};
