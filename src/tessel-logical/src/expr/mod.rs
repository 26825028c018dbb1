//! Expression trees for projections, predicates and keys.

mod agg;
mod binary;
mod expression;
mod func;

pub use agg::AggOp;
pub use binary::BinaryOp;
pub use expression::{ColumnRef, ExprKind, Expression, UnaryOp};
pub use func::{FuncExpr, ScalarFunc};

use tessel_core::Value;

/// Shorthand for an unbound column reference.
pub fn col(name: impl Into<String>) -> Expression {
    Expression::column(name)
}

/// Shorthand for a literal.
pub fn lit(value: impl Into<Value>) -> Expression {
    Expression::literal(value)
}
