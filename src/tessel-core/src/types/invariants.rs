//! Type invariant checking.

use common_error::{TesselError, TesselResult};

use super::{DataType, Value};

/// Check that a value conforms to the expected data type.
pub fn check_type_invariants(value: &Value, expected: &DataType) -> TesselResult<()> {
    match (value, expected) {
        // Null is valid in any column
        (Value::Null, _) => Ok(()),

        // Anything can be held as an opaque object
        (_, DataType::Object) => Ok(()),

        (Value::Bool(_), DataType::Bool)
        | (Value::Int64(_), DataType::Int64)
        | (Value::Float64(_), DataType::Float64)
        | (Value::String(_), DataType::String)
        | (Value::Binary(_), DataType::Binary)
        | (Value::Date(_), DataType::Date) => Ok(()),

        // Int can coerce to Float
        (Value::Int64(_), DataType::Float64) => Ok(()),

        (val, ty) => Err(TesselError::type_error(format!(
            "Expected {}, got {}",
            ty.display_name(),
            val.type_name()
        ))),
    }
}

/// Check every value of a column against its declared type.
pub fn check_values_invariants(values: &[Value], expected: &DataType) -> TesselResult<()> {
    for (i, value) in values.iter().enumerate() {
        check_type_invariants(value, expected)
            .map_err(|e| TesselError::type_error(format!("Row {i}: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_invariants() {
        assert!(check_type_invariants(&Value::Int64(1), &DataType::Int64).is_ok());
        assert!(check_type_invariants(&Value::Int64(1), &DataType::Float64).is_ok());
        assert!(check_type_invariants(&Value::Null, &DataType::String).is_ok());
        assert!(check_type_invariants(&Value::List(vec![]), &DataType::Object).is_ok());
        assert!(check_type_invariants(&Value::from("x"), &DataType::Int64).is_err());
    }

    #[test]
    fn test_values_invariants_reports_row() {
        let values = vec![Value::Int64(1), Value::from("oops")];
        let err = check_values_invariants(&values, &DataType::Int64).unwrap_err();
        assert!(err.to_string().contains("Row 1"));
    }
}
