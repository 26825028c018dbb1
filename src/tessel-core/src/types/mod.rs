//! Type system for Tessel values.
//!
//! This module defines the `Value` enum for runtime values and `DataType`
//! for resolved expression types, plus invariant checks that bind the two.

mod data_type;
mod invariants;
mod value;

pub use data_type::DataType;
pub use invariants::{check_type_invariants, check_values_invariants};
pub use value::{Value, ValueKey};
