//! Binary operators for expressions.

use serde::{Deserialize, Serialize};

use tessel_core::DataType;

/// Binary operators.
///
/// Every operator has a static type rule in [`BinaryOp::result_type`];
/// evaluation never starts for an expression whose rule fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic operators
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// True division (/), always produces Float64
    Divide,
    /// Modulo (%)
    Modulo,

    // Comparison operators
    /// Equality (=)
    Eq,
    /// Inequality (<>)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,

    // Logical operators
    /// Logical AND
    And,
    /// Logical OR
    Or,

    // String operators
    /// String concatenation
    Concat,
}

impl BinaryOp {
    /// Check if this is an arithmetic operator.
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    /// Check if this is a comparison operator.
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Check if this is a logical operator.
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Get the result type of this operator given input types.
    ///
    /// Returns `None` if the operation is not valid for the given types.
    pub fn result_type(&self, left: &DataType, right: &DataType) -> Option<DataType> {
        match self {
            Self::Divide => match (left, right) {
                (l, r) if numeric_or_null(l) && numeric_or_null(r) => Some(DataType::Float64),
                _ => None,
            },

            // Arithmetic: numeric types, result is widest type
            Self::Add | Self::Subtract | Self::Multiply | Self::Modulo => match (left, right) {
                (DataType::Int64, DataType::Int64) => Some(DataType::Int64),
                (DataType::Float64, DataType::Float64)
                | (DataType::Int64, DataType::Float64)
                | (DataType::Float64, DataType::Int64) => Some(DataType::Float64),
                (DataType::Null, t) | (t, DataType::Null) if numeric_or_null(t) => Some(t.clone()),
                _ => None,
            },

            // Equality is defined for every pair of compatible types, including objects
            Self::Eq | Self::NotEq => left.common_supertype(right).map(|_| DataType::Bool),

            // Ordering needs an orderable common type
            Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => match left.common_supertype(right) {
                Some(t) if t.is_orderable() => Some(DataType::Bool),
                _ => None,
            },

            // Logical: both must be Bool
            Self::And | Self::Or => match (left, right) {
                (DataType::Bool | DataType::Null, DataType::Bool | DataType::Null) => {
                    Some(DataType::Bool)
                }
                _ => None,
            },

            Self::Concat => match (left, right) {
                (DataType::String | DataType::Null, DataType::String | DataType::Null) => {
                    Some(DataType::String)
                }
                _ => None,
            },
        }
    }

    /// Get the operator symbol for display.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
        }
    }
}

fn numeric_or_null(t: &DataType) -> bool {
    t.is_numeric() || *t == DataType::Null
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_type_inference() {
        assert_eq!(
            BinaryOp::Add.result_type(&DataType::Int64, &DataType::Int64),
            Some(DataType::Int64)
        );
        assert_eq!(
            BinaryOp::Add.result_type(&DataType::Int64, &DataType::Float64),
            Some(DataType::Float64)
        );
        assert_eq!(
            BinaryOp::Divide.result_type(&DataType::Int64, &DataType::Int64),
            Some(DataType::Float64)
        );
        assert_eq!(
            BinaryOp::Add.result_type(&DataType::String, &DataType::Int64),
            None
        );
    }

    #[test]
    fn test_comparison_type_inference() {
        assert_eq!(
            BinaryOp::Eq.result_type(&DataType::Int64, &DataType::Float64),
            Some(DataType::Bool)
        );
        assert_eq!(
            BinaryOp::Lt.result_type(&DataType::String, &DataType::String),
            Some(DataType::Bool)
        );
        assert_eq!(
            BinaryOp::Eq.result_type(&DataType::Object, &DataType::Int64),
            Some(DataType::Bool)
        );
        assert_eq!(
            BinaryOp::Lt.result_type(&DataType::Object, &DataType::Object),
            None
        );
        assert_eq!(
            BinaryOp::Eq.result_type(&DataType::String, &DataType::Int64),
            None
        );
    }

    #[test]
    fn test_logical_type_inference() {
        assert_eq!(
            BinaryOp::And.result_type(&DataType::Bool, &DataType::Bool),
            Some(DataType::Bool)
        );
        assert_eq!(
            BinaryOp::Or.result_type(&DataType::Int64, &DataType::Bool),
            None
        );
    }

    #[test]
    fn test_operator_classification() {
        assert!(BinaryOp::Add.is_arithmetic());
        assert!(!BinaryOp::Add.is_comparison());
        assert!(BinaryOp::Eq.is_comparison());
        assert!(BinaryOp::And.is_logical());
        assert!(!BinaryOp::Concat.is_arithmetic());
    }
}
