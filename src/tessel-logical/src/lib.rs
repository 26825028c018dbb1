//! Logical expression layer for Tessel.
//!
//! This crate provides:
//! - Expression trees with late-bound column references and resolved identities
//! - Static type inference for every operator and function
//! - `ExpressionList`, the resolved schema/projection consumed by partitions

pub mod expr;
pub mod schema;

// Re-export commonly used types
pub use expr::{
    col, lit, AggOp, BinaryOp, ColumnRef, ExprKind, Expression, FuncExpr, ScalarFunc, UnaryOp,
};
pub use schema::ExpressionList;
