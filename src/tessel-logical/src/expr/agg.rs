//! Aggregation operators.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common_error::{TesselError, TesselResult};
use tessel_core::DataType;

/// Closed set of aggregation operators applied by partition aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggOp {
    /// Sum of non-null values.
    Sum,
    /// Arithmetic mean of non-null values.
    Mean,
    /// Minimum non-null value.
    Min,
    /// Maximum non-null value.
    Max,
    /// Number of non-null values.
    Count,
}

impl AggOp {
    /// Get the result type of this aggregate given the input type.
    ///
    /// Returns `None` if the operation is not valid for the given type.
    pub fn result_type(&self, input: &DataType) -> Option<DataType> {
        match self {
            Self::Count => Some(DataType::Int64),
            Self::Sum => match input {
                DataType::Int64 | DataType::Null => Some(DataType::Int64),
                DataType::Float64 => Some(DataType::Float64),
                _ => None,
            },
            Self::Mean => match input {
                DataType::Int64 | DataType::Float64 | DataType::Null => Some(DataType::Float64),
                _ => None,
            },
            Self::Min | Self::Max => input.is_orderable().then(|| input.clone()),
        }
    }

    /// Get the operator name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

impl FromStr for AggOp {
    type Err = TesselError;

    fn from_str(s: &str) -> TesselResult<Self> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "count" => Ok(Self::Count),
            other => Err(TesselError::invalid_parameter(format!(
                "Unknown aggregation operator: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for AggOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("sum".parse::<AggOp>().unwrap(), AggOp::Sum);
        assert_eq!("count".parse::<AggOp>().unwrap(), AggOp::Count);
        assert!(matches!(
            "median".parse::<AggOp>(),
            Err(TesselError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_result_types() {
        assert_eq!(AggOp::Sum.result_type(&DataType::Int64), Some(DataType::Int64));
        assert_eq!(AggOp::Mean.result_type(&DataType::Int64), Some(DataType::Float64));
        assert_eq!(AggOp::Count.result_type(&DataType::Object), Some(DataType::Int64));
        assert_eq!(AggOp::Min.result_type(&DataType::String), Some(DataType::String));
        assert_eq!(AggOp::Sum.result_type(&DataType::String), None);
        assert_eq!(AggOp::Max.result_type(&DataType::Object), None);
    }
}
