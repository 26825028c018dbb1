//! Data type definitions for resolved expressions.

use arrow_schema::DataType as ArrowDataType;
use serde::{Deserialize, Serialize};

use common_error::{TesselError, TesselResult};

/// Resolved value type of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Null type (unknown or absent).
    Null,
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Binary,
    /// Date (days since epoch).
    Date,
    /// Opaque values the vector engine cannot represent.
    ///
    /// Columns of this type are kept in a generic list block.
    Object,
}

impl DataType {
    /// Check if this type is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Check if this type is a string type.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Check if this type is a temporal type.
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Date)
    }

    /// Check if values of this type can live in the vector engine.
    pub const fn is_vectorizable(&self) -> bool {
        !matches!(self, Self::Object)
    }

    /// Check if values of this type have a total order.
    pub const fn is_orderable(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool | Self::Int64 | Self::Float64 | Self::String | Self::Date
        )
    }

    /// Get the display name for this type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool => "Bool",
            Self::Int64 => "Int64",
            Self::Float64 => "Float64",
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Date => "Date",
            Self::Object => "Object",
        }
    }

    /// Check if this type can be coerced to another type.
    pub fn can_coerce_to(&self, target: &Self) -> bool {
        if self == target {
            return true;
        }

        // Null coerces to anything, Int64 widens to Float64, anything fits in Object
        matches!(
            (self, target),
            (Self::Null, _) | (Self::Int64, Self::Float64) | (_, Self::Object)
        )
    }

    /// Get the common supertype of two types (for type inference).
    pub fn common_supertype(&self, other: &Self) -> Option<Self> {
        if self == other {
            return Some(self.clone());
        }

        match (self, other) {
            (Self::Null, t) | (t, Self::Null) => Some(t.clone()),
            (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Some(Self::Float64),
            (Self::Object, _) | (_, Self::Object) => Some(Self::Object),
            _ => None,
        }
    }

    /// Arrow type used for vectorizable columns, `None` for `Object`.
    pub fn to_arrow(&self) -> Option<ArrowDataType> {
        match self {
            Self::Null => Some(ArrowDataType::Null),
            Self::Bool => Some(ArrowDataType::Boolean),
            Self::Int64 => Some(ArrowDataType::Int64),
            Self::Float64 => Some(ArrowDataType::Float64),
            Self::String => Some(ArrowDataType::Utf8),
            Self::Binary => Some(ArrowDataType::Binary),
            Self::Date => Some(ArrowDataType::Date32),
            Self::Object => None,
        }
    }

    /// Map an Arrow type onto a Tessel type.
    ///
    /// Narrow integer and float types widen to `Int64` / `Float64`; large
    /// string and binary types map onto `String` / `Binary`.
    pub fn from_arrow(dtype: &ArrowDataType) -> TesselResult<Self> {
        match dtype {
            ArrowDataType::Null => Ok(Self::Null),
            ArrowDataType::Boolean => Ok(Self::Bool),
            ArrowDataType::Int8
            | ArrowDataType::Int16
            | ArrowDataType::Int32
            | ArrowDataType::Int64
            | ArrowDataType::UInt8
            | ArrowDataType::UInt16
            | ArrowDataType::UInt32
            | ArrowDataType::UInt64 => Ok(Self::Int64),
            ArrowDataType::Float16 | ArrowDataType::Float32 | ArrowDataType::Float64 => {
                Ok(Self::Float64)
            }
            ArrowDataType::Utf8 | ArrowDataType::LargeUtf8 => Ok(Self::String),
            ArrowDataType::Binary | ArrowDataType::LargeBinary => Ok(Self::Binary),
            ArrowDataType::Date32 => Ok(Self::Date),
            other => Err(TesselError::type_error(format!(
                "Unsupported arrow type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
