//! Conversion between Arrow arrays and runtime values.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Date32Array, Float64Array, Int64Array, NullArray,
    StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::DataType as ArrowDataType;
use arrow_array::cast::AsArray;
use arrow_array::types::{Date32Type, Float64Type, Int64Type};

use common_error::{TesselError, TesselResult};
use tessel_core::types::check_values_invariants;
use tessel_core::{DataType, Value};

/// Read every slot of an Arrow array as a [`Value`].
///
/// Arrays of non-canonical types (e.g. `Int32`, `LargeUtf8`) are cast to the
/// canonical Arrow type of their Tessel type first.
pub(crate) fn array_to_values(array: &dyn Array) -> TesselResult<Vec<Value>> {
    let values = match array.data_type() {
        ArrowDataType::Null => vec![Value::Null; array.len()],
        ArrowDataType::Boolean => array.as_boolean().iter().map(Value::from).collect(),
        ArrowDataType::Int64 => array
            .as_primitive::<Int64Type>()
            .iter()
            .map(Value::from)
            .collect(),
        ArrowDataType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(Value::from)
            .collect(),
        ArrowDataType::Utf8 => array.as_string::<i32>().iter().map(Value::from).collect(),
        ArrowDataType::Binary => array
            .as_binary::<i32>()
            .iter()
            .map(|v| v.map_or(Value::Null, |b| Value::Binary(b.to_vec())))
            .collect(),
        ArrowDataType::Date32 => array
            .as_primitive::<Date32Type>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Date))
            .collect(),
        other => {
            let canonical = canonical_arrow_type(other)?;
            let casted = cast(array, &canonical)?;
            return array_to_values(casted.as_ref());
        }
    };
    Ok(values)
}

/// Build an Arrow array of the given type from values.
///
/// Every value is checked against `dtype` first.
pub(crate) fn values_to_array(values: &[Value], dtype: &DataType) -> TesselResult<ArrayRef> {
    check_values_invariants(values, dtype)?;
    let array: ArrayRef = match dtype {
        DataType::Null => Arc::new(NullArray::new(values.len())),
        DataType::Bool => Arc::new(values.iter().map(Value::as_bool).collect::<BooleanArray>()),
        DataType::Int64 => Arc::new(values.iter().map(Value::as_int64).collect::<Int64Array>()),
        DataType::Float64 => {
            Arc::new(values.iter().map(Value::as_float64).collect::<Float64Array>())
        }
        DataType::String => Arc::new(values.iter().map(Value::as_str).collect::<StringArray>()),
        DataType::Binary => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Binary(b) => Some(b.as_slice()),
                    _ => None,
                })
                .collect::<BinaryArray>(),
        ),
        DataType::Date => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some(*d),
                    _ => None,
                })
                .collect::<Date32Array>(),
        ),
        DataType::Object => {
            return Err(TesselError::internal(
                "object values have no Arrow representation",
            ))
        }
    };
    Ok(array)
}

/// Narrowest type that holds every non-null value.
///
/// Values of incompatible kinds fall back to `Object`.
pub(crate) fn infer_data_type(values: &[Value]) -> DataType {
    values
        .iter()
        .filter(|v| !v.is_null())
        .fold(DataType::Null, |acc, v| {
            acc.common_supertype(&v.data_type())
                .unwrap_or(DataType::Object)
        })
}

/// The Arrow type a Tessel block of this Arrow type is normalized to.
pub(crate) fn canonical_arrow_type(dtype: &ArrowDataType) -> TesselResult<ArrowDataType> {
    DataType::from_arrow(dtype)?
        .to_arrow()
        .ok_or_else(|| TesselError::internal(format!("no canonical Arrow type for {dtype}")))
}
