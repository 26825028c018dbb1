//! Expression evaluator implementation.

use std::collections::HashMap;

use common_error::{TesselError, TesselResult};
use tessel_core::{ColumnId, DataType, Value};
use tessel_logical::{ExprKind, Expression};

use crate::block::DataBlock;

/// Evaluates resolved expressions against a set of column blocks.
///
/// Every block in the environment must have `num_rows` values; literals are
/// broadcast to that length.
#[derive(Debug, Clone, Copy)]
pub struct ExprEvaluator<'a> {
    columns: &'a HashMap<ColumnId, DataBlock>,
    num_rows: usize,
}

impl<'a> ExprEvaluator<'a> {
    /// Create an evaluator over `columns`.
    pub fn new(columns: &'a HashMap<ColumnId, DataBlock>, num_rows: usize) -> Self {
        Self { columns, num_rows }
    }

    /// Number of rows every result will have.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Evaluate an expression to a block of `num_rows` values.
    pub fn evaluate(&self, expr: &Expression) -> TesselResult<DataBlock> {
        match expr.kind() {
            ExprKind::Column(col) => {
                let id = expr.id().ok_or_else(|| {
                    TesselError::unresolved_column(format!(
                        "column '{}' must be resolved before evaluation",
                        col.name
                    ))
                })?;
                self.columns.get(&id).cloned().ok_or_else(|| {
                    TesselError::execution(format!(
                        "column '{}' ({id}) is not present in this partition",
                        col.name
                    ))
                })
            }

            ExprKind::Literal(value) => self.eval_literal(value),

            ExprKind::Unary { op, expr } => self.evaluate(expr)?.unary_op(*op),

            ExprKind::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                left.binary_op(&right, *op)
            }

            ExprKind::Call(func) => {
                let args = func
                    .args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<TesselResult<Vec<_>>>()?;
                DataBlock::call(&func.func, &args)
            }

            // Alias doesn't change the value
            ExprKind::Alias { expr, .. } => self.evaluate(expr),
        }
    }

    /// Evaluate a predicate expression, which must produce booleans.
    pub fn evaluate_predicate(&self, expr: &Expression) -> TesselResult<DataBlock> {
        let result = self.evaluate(expr)?;
        match result.data_type()? {
            DataType::Bool => Ok(result),
            DataType::Null => result.cast(&DataType::Bool),
            other => Err(TesselError::type_error(format!(
                "predicate {expr} must evaluate to Bool, got {other}"
            ))),
        }
    }

    fn eval_literal(&self, value: &Value) -> TesselResult<DataBlock> {
        DataBlock::full(value, self.num_rows)
    }
}
