//! Scalar function calls.

use serde::{Deserialize, Serialize};

use common_error::{TesselError, TesselResult};
use tessel_core::{DataType, ResourceRequest};

use super::Expression;

/// Built-in scalar functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarFunc {
    /// Absolute value of a number.
    Abs,
    /// Convert to the given type.
    Cast(DataType),
    /// Substring test against a fixed pattern.
    Contains(String),
    /// Prefix test against a fixed pattern.
    StartsWith(String),
    /// Suffix test against a fixed pattern.
    EndsWith(String),
    /// Number of characters in a string.
    Length,
    /// Year of a date.
    Year,
    /// Month of a date (1-12).
    Month,
    /// Day of month of a date (1-31).
    Day,
    /// Day of week of a date (Monday = 0).
    DayOfWeek,
    /// `if cond then a else b`, row-wise.
    IfElse,
}

impl ScalarFunc {
    /// Get the function name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Cast(_) => "cast",
            Self::Contains(_) => "contains",
            Self::StartsWith(_) => "starts_with",
            Self::EndsWith(_) => "ends_with",
            Self::Length => "length",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::DayOfWeek => "day_of_week",
            Self::IfElse => "if_else",
        }
    }

    /// Number of arguments the function takes.
    pub const fn arity(&self) -> usize {
        match self {
            Self::IfElse => 3,
            _ => 1,
        }
    }

    /// Result type of the function applied to arguments of the given types.
    pub fn result_type(&self, args: &[DataType]) -> TesselResult<DataType> {
        if args.len() != self.arity() {
            return Err(TesselError::type_resolution(format!(
                "{} expects {} argument(s), got {}",
                self.name(),
                self.arity(),
                args.len()
            )));
        }
        let mismatch = || {
            TesselError::type_resolution(format!(
                "{} is not defined for ({})",
                self.name(),
                args.iter()
                    .map(DataType::display_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        };

        match self {
            Self::Abs => match &args[0] {
                t if t.is_numeric() => Ok(t.clone()),
                DataType::Null => Ok(DataType::Null),
                _ => Err(mismatch()),
            },
            Self::Cast(target) => match (&args[0], target) {
                (from, to) if from == to => Ok(to.clone()),
                (_, DataType::Object) => Ok(DataType::Object),
                (DataType::Object, _) | (_, DataType::Null) => Err(mismatch()),
                (_, to) => Ok(to.clone()),
            },
            Self::Contains(_) | Self::StartsWith(_) | Self::EndsWith(_) => match &args[0] {
                DataType::String | DataType::Null => Ok(DataType::Bool),
                _ => Err(mismatch()),
            },
            Self::Length => match &args[0] {
                DataType::String | DataType::Null => Ok(DataType::Int64),
                _ => Err(mismatch()),
            },
            Self::Year | Self::Month | Self::Day | Self::DayOfWeek => match &args[0] {
                DataType::Date | DataType::Null => Ok(DataType::Int64),
                _ => Err(mismatch()),
            },
            Self::IfElse => {
                if !matches!(args[0], DataType::Bool | DataType::Null) {
                    return Err(mismatch());
                }
                args[1].common_supertype(&args[2]).ok_or_else(mismatch)
            }
        }
    }
}

impl std::fmt::Display for ScalarFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cast(t) => write!(f, "cast<{t}>"),
            Self::Contains(p) | Self::StartsWith(p) | Self::EndsWith(p) => {
                write!(f, "{}<{p:?}>", self.name())
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// A function call expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncExpr {
    /// The function being called.
    pub func: ScalarFunc,
    /// Argument expressions.
    pub args: Vec<Expression>,
    /// Resources needed to run the function, if any.
    pub resource_request: Option<ResourceRequest>,
}

impl FuncExpr {
    /// Create a new function call.
    pub fn new(func: ScalarFunc, args: Vec<Expression>) -> Self {
        Self {
            func,
            args,
            resource_request: None,
        }
    }

    /// Attach a resource request.
    #[must_use]
    pub fn with_resource_request(mut self, request: ResourceRequest) -> Self {
        self.resource_request = Some(request);
        self
    }
}

// ============================================================================
// Builder methods
// ============================================================================

impl Expression {
    /// Absolute value.
    pub fn abs(self) -> Self {
        Self::call(ScalarFunc::Abs, vec![self])
    }

    /// Cast to a type.
    pub fn cast(self, dtype: DataType) -> Self {
        Self::call(ScalarFunc::Cast(dtype), vec![self])
    }

    /// Substring test.
    pub fn contains(self, pattern: impl Into<String>) -> Self {
        Self::call(ScalarFunc::Contains(pattern.into()), vec![self])
    }

    /// Prefix test.
    pub fn starts_with(self, pattern: impl Into<String>) -> Self {
        Self::call(ScalarFunc::StartsWith(pattern.into()), vec![self])
    }

    /// Suffix test.
    pub fn ends_with(self, pattern: impl Into<String>) -> Self {
        Self::call(ScalarFunc::EndsWith(pattern.into()), vec![self])
    }

    /// String length.
    pub fn length(self) -> Self {
        Self::call(ScalarFunc::Length, vec![self])
    }

    /// Year of a date.
    pub fn year(self) -> Self {
        Self::call(ScalarFunc::Year, vec![self])
    }

    /// Month of a date.
    pub fn month(self) -> Self {
        Self::call(ScalarFunc::Month, vec![self])
    }

    /// Day of month of a date.
    pub fn day(self) -> Self {
        Self::call(ScalarFunc::Day, vec![self])
    }

    /// Day of week of a date.
    pub fn day_of_week(self) -> Self {
        Self::call(ScalarFunc::DayOfWeek, vec![self])
    }

    /// Row-wise conditional: `self` is the condition.
    pub fn if_else(self, if_true: Self, if_false: Self) -> Self {
        Self::call(ScalarFunc::IfElse, vec![self, if_true, if_false])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_is_checked() {
        let err = ScalarFunc::IfElse
            .result_type(&[DataType::Bool, DataType::Int64])
            .unwrap_err();
        assert!(matches!(err, TesselError::TypeResolution(_)));
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(
            ScalarFunc::Contains("a".into())
                .result_type(&[DataType::String])
                .unwrap(),
            DataType::Bool
        );
        assert_eq!(
            ScalarFunc::Length.result_type(&[DataType::String]).unwrap(),
            DataType::Int64
        );
        assert!(ScalarFunc::Length.result_type(&[DataType::Int64]).is_err());
    }

    #[test]
    fn test_cast_rules() {
        let to_str = ScalarFunc::Cast(DataType::String);
        assert_eq!(
            to_str.result_type(&[DataType::Int64]).unwrap(),
            DataType::String
        );
        assert!(to_str.result_type(&[DataType::Object]).is_err());
        assert_eq!(
            ScalarFunc::Cast(DataType::Object)
                .result_type(&[DataType::Int64])
                .unwrap(),
            DataType::Object
        );
    }

    #[test]
    fn test_if_else_widens_branches() {
        assert_eq!(
            ScalarFunc::IfElse
                .result_type(&[DataType::Bool, DataType::Int64, DataType::Float64])
                .unwrap(),
            DataType::Float64
        );
        assert!(ScalarFunc::IfElse
            .result_type(&[DataType::Int64, DataType::Int64, DataType::Int64])
            .is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ScalarFunc::Abs.to_string(), "abs");
        assert_eq!(ScalarFunc::Cast(DataType::Float64).to_string(), "cast<Float64>");
        assert_eq!(
            ScalarFunc::StartsWith("ab".into()).to_string(),
            "starts_with<\"ab\">"
        );
    }
}
