//! Element-wise operators over blocks.
//!
//! Arrow blocks go through Arrow compute kernels. As soon as one operand is a
//! generic block the operator runs value by value.

use std::cmp::Ordering;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Int64Array, NullArray, StringArray};
use arrow::compute::kernels::temporal::{date_part, DatePart};
use arrow::compute::kernels::{boolean, cmp, numeric, zip::zip};
use arrow::compute;
use arrow::datatypes::DataType as ArrowDataType;
use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int64Type};

use common_error::{TesselError, TesselResult};
use tessel_core::{DataType, Value};
use tessel_logical::{BinaryOp, ScalarFunc, UnaryOp};

use super::{values_to_array, DataBlock};

/// Read a block as a boolean mask.
pub(crate) fn as_boolean_array(block: &DataBlock) -> TesselResult<BooleanArray> {
    match block {
        DataBlock::Arrow(array) => match array.data_type() {
            ArrowDataType::Boolean => Ok(array.as_boolean().clone()),
            ArrowDataType::Null => Ok(BooleanArray::new_null(array.len())),
            other => Err(TesselError::type_error(format!(
                "expected a boolean block, got {other}"
            ))),
        },
        DataBlock::PyList(values) => values
            .iter()
            .map(|v| match v {
                Value::Bool(b) => Ok(Some(*b)),
                Value::Null => Ok(None),
                other => Err(TesselError::type_error(format!(
                    "expected a boolean value, got {}",
                    other.type_name()
                ))),
            })
            .collect::<TesselResult<Vec<_>>>()
            .map(BooleanArray::from),
    }
}

fn null_block(len: usize) -> DataBlock {
    DataBlock::Arrow(Arc::new(NullArray::new(len)))
}

fn check_same_len(a: &DataBlock, b: &DataBlock) -> TesselResult<()> {
    if a.len() != b.len() {
        return Err(TesselError::value_error(format!(
            "operand lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

impl DataBlock {
    /// Apply a binary operator row by row.
    pub fn binary_op(&self, other: &Self, op: BinaryOp) -> TesselResult<Self> {
        check_same_len(self, other)?;
        match (self, other) {
            (Self::Arrow(left), Self::Arrow(right)) => arrow_binary(left, right, op),
            _ => {
                let values = self
                    .to_values()?
                    .iter()
                    .zip(other.to_values()?.iter())
                    .map(|(l, r)| binary_values(l, r, op))
                    .collect::<TesselResult<Vec<_>>>()?;
                Self::from_inferred_values(values)
            }
        }
    }

    /// Apply a unary operator row by row.
    pub fn unary_op(&self, op: UnaryOp) -> TesselResult<Self> {
        match self {
            Self::Arrow(array) => {
                let result: ArrayRef = match op {
                    UnaryOp::Not => Arc::new(boolean::not(&as_boolean_array(self)?)?),
                    UnaryOp::Neg if *array.data_type() == ArrowDataType::Null => array.clone(),
                    UnaryOp::Neg => numeric::neg(array.as_ref())?,
                    UnaryOp::IsNull => Arc::new(compute::is_null(array.as_ref())?),
                    UnaryOp::IsNotNull => Arc::new(compute::is_not_null(array.as_ref())?),
                };
                Ok(Self::Arrow(result))
            }
            Self::PyList(values) => {
                let out = values
                    .iter()
                    .map(|v| unary_value(v, op))
                    .collect::<TesselResult<Vec<_>>>()?;
                Self::from_inferred_values(out)
            }
        }
    }

    /// Convert to another type.
    pub fn cast(&self, dtype: &DataType) -> TesselResult<Self> {
        if self.data_type()? == *dtype {
            return Ok(self.clone());
        }
        match (self, dtype.to_arrow()) {
            (_, None) => Ok(Self::py_list(self.to_values()?)),
            (Self::Arrow(array), Some(target)) => {
                Ok(Self::Arrow(compute::cast(array.as_ref(), &target)?))
            }
            (Self::PyList(values), Some(_)) => Self::from_values(values.as_ref().clone(), dtype),
        }
    }

    /// Evaluate a scalar function over argument blocks.
    pub fn call(func: &ScalarFunc, args: &[Self]) -> TesselResult<Self> {
        if args.len() != func.arity() {
            return Err(TesselError::internal(format!(
                "{} called with {} argument(s)",
                func.name(),
                args.len()
            )));
        }
        let input = &args[0];
        match func {
            ScalarFunc::Abs => abs(input),
            ScalarFunc::Cast(dtype) => input.cast(dtype),
            ScalarFunc::Contains(p) => bool_block(map_str(input, |s| s.contains(p.as_str()))?),
            ScalarFunc::StartsWith(p) => {
                bool_block(map_str(input, |s| s.starts_with(p.as_str()))?)
            }
            ScalarFunc::EndsWith(p) => bool_block(map_str(input, |s| s.ends_with(p.as_str()))?),
            ScalarFunc::Length => Ok(Self::Arrow(Arc::new(Int64Array::from(map_str(
                input,
                |s| s.chars().count() as i64,
            )?)))),
            ScalarFunc::Year => extract_date_part(input, DatePart::Year),
            ScalarFunc::Month => extract_date_part(input, DatePart::Month),
            ScalarFunc::Day => extract_date_part(input, DatePart::Day),
            ScalarFunc::DayOfWeek => extract_date_part(input, DatePart::DayOfWeekMonday0),
            ScalarFunc::IfElse => if_else(&args[0], &args[1], &args[2]),
        }
    }
}

// ============================================================================
// Arrow kernels
// ============================================================================

fn arrow_binary(left: &ArrayRef, right: &ArrayRef, op: BinaryOp) -> TesselResult<DataBlock> {
    let l_type = DataType::from_arrow(left.data_type())?;
    let r_type = DataType::from_arrow(right.data_type())?;
    let result_type = op.result_type(&l_type, &r_type).ok_or_else(|| {
        TesselError::type_resolution(format!("{l_type} {op} {r_type} is not defined"))
    })?;

    let operand_type = if op.is_comparison() {
        l_type.common_supertype(&r_type).unwrap_or(DataType::Null)
    } else {
        result_type.clone()
    };
    let Some(operand_arrow) = operand_type.to_arrow() else {
        return Err(TesselError::internal(format!(
            "no vector kernel for {op} over {operand_type}"
        )));
    };
    if operand_type == DataType::Null {
        return Ok(if result_type == DataType::Bool {
            DataBlock::Arrow(Arc::new(BooleanArray::new_null(left.len())))
        } else {
            null_block(left.len())
        });
    }
    let left = compute::cast(left.as_ref(), &operand_arrow)?;
    let right = compute::cast(right.as_ref(), &operand_arrow)?;

    let result: ArrayRef = match op {
        BinaryOp::Add => numeric::add(&left, &right)?,
        BinaryOp::Subtract => numeric::sub(&left, &right)?,
        BinaryOp::Multiply => numeric::mul(&left, &right)?,
        BinaryOp::Divide => numeric::div(&left, &right)?,
        BinaryOp::Modulo => numeric::rem(&left, &right)?,

        BinaryOp::Eq => Arc::new(cmp::eq(&left, &right)?),
        BinaryOp::NotEq => Arc::new(cmp::neq(&left, &right)?),
        BinaryOp::Lt => Arc::new(cmp::lt(&left, &right)?),
        BinaryOp::LtEq => Arc::new(cmp::lt_eq(&left, &right)?),
        BinaryOp::Gt => Arc::new(cmp::gt(&left, &right)?),
        BinaryOp::GtEq => Arc::new(cmp::gt_eq(&left, &right)?),

        BinaryOp::And => Arc::new(boolean::and(left.as_boolean(), right.as_boolean())?),
        BinaryOp::Or => Arc::new(boolean::or(left.as_boolean(), right.as_boolean())?),

        BinaryOp::Concat => {
            let result: StringArray = left
                .as_string::<i32>()
                .iter()
                .zip(right.as_string::<i32>().iter())
                .map(|(l, r)| match (l, r) {
                    (Some(l), Some(r)) => Some(format!("{l}{r}")),
                    _ => None,
                })
                .collect();
            Arc::new(result)
        }
    };
    Ok(DataBlock::Arrow(result))
}

fn abs(input: &DataBlock) -> TesselResult<DataBlock> {
    match input {
        DataBlock::Arrow(array) => match array.data_type() {
            ArrowDataType::Int64 => Ok(DataBlock::Arrow(Arc::new(
                array
                    .as_primitive::<Int64Type>()
                    .unary::<_, Int64Type>(i64::wrapping_abs),
            ))),
            ArrowDataType::Float64 => Ok(DataBlock::Arrow(Arc::new(
                array
                    .as_primitive::<Float64Type>()
                    .unary::<_, Float64Type>(f64::abs),
            ))),
            ArrowDataType::Null => Ok(input.clone()),
            other => Err(TesselError::type_error(format!("abs is not defined for {other}"))),
        },
        DataBlock::PyList(values) => {
            let out = values
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(Value::Null),
                    Value::Int64(i) => Ok(Value::Int64(i.wrapping_abs())),
                    Value::Float64(f) => Ok(Value::Float64(f.abs())),
                    other => Err(TesselError::type_error(format!(
                        "abs is not defined for {}",
                        other.type_name()
                    ))),
                })
                .collect::<TesselResult<Vec<_>>>()?;
            DataBlock::from_inferred_values(out)
        }
    }
}

fn map_str<T, F>(input: &DataBlock, f: F) -> TesselResult<Vec<Option<T>>>
where
    F: Fn(&str) -> T,
{
    match input {
        DataBlock::Arrow(array) if *array.data_type() == ArrowDataType::Utf8 => {
            Ok(array.as_string::<i32>().iter().map(|s| s.map(&f)).collect())
        }
        _ => input
            .to_values()?
            .iter()
            .map(|v| match v {
                Value::Null => Ok(None),
                Value::String(s) => Ok(Some(f(s))),
                other => Err(TesselError::type_error(format!(
                    "expected a string, got {}",
                    other.type_name()
                ))),
            })
            .collect(),
    }
}

fn bool_block(values: Vec<Option<bool>>) -> TesselResult<DataBlock> {
    Ok(DataBlock::Arrow(Arc::new(BooleanArray::from(values))))
}

fn extract_date_part(input: &DataBlock, part: DatePart) -> TesselResult<DataBlock> {
    let array = match input {
        DataBlock::Arrow(array) => array.clone(),
        DataBlock::PyList(values) => values_to_array(values, &DataType::Date)?,
    };
    let dates = compute::cast(array.as_ref(), &ArrowDataType::Date32)?;
    let parts = date_part(dates.as_ref(), part)?;
    Ok(DataBlock::Arrow(compute::cast(
        parts.as_ref(),
        &ArrowDataType::Int64,
    )?))
}

fn if_else(cond: &DataBlock, if_true: &DataBlock, if_false: &DataBlock) -> TesselResult<DataBlock> {
    check_same_len(cond, if_true)?;
    check_same_len(cond, if_false)?;
    // A null condition selects the false branch.
    let mask: BooleanArray = as_boolean_array(cond)?
        .iter()
        .map(|b| Some(b == Some(true)))
        .collect();

    let t_type = if_true.data_type()?;
    let f_type = if_false.data_type()?;
    let common = t_type.common_supertype(&f_type).ok_or_else(|| {
        TesselError::type_resolution(format!("if_else branches {t_type} and {f_type} differ"))
    })?;

    match common.to_arrow() {
        Some(_) if common == DataType::Null => Ok(null_block(cond.len())),
        Some(_) => {
            let (DataBlock::Arrow(t), DataBlock::Arrow(f)) =
                (if_true.cast(&common)?, if_false.cast(&common)?)
            else {
                return Err(TesselError::internal("vectorizable branch was not an Arrow block"));
            };
            Ok(DataBlock::Arrow(zip(&mask, &t, &f)?))
        }
        None => {
            let t = if_true.to_values()?;
            let f = if_false.to_values()?;
            let values = mask
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    if m == Some(true) {
                        t[i].clone()
                    } else {
                        f[i].clone()
                    }
                })
                .collect();
            Ok(DataBlock::py_list(values))
        }
    }
}

// ============================================================================
// Value-wise fallbacks
// ============================================================================

fn unary_value(value: &Value, op: UnaryOp) -> TesselResult<Value> {
    match (op, value) {
        (UnaryOp::IsNull, v) => Ok(Value::Bool(v.is_null())),
        (UnaryOp::IsNotNull, v) => Ok(Value::Bool(!v.is_null())),
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int64(i)) => Ok(Value::Int64(i.wrapping_neg())),
        (UnaryOp::Neg, Value::Float64(f)) => Ok(Value::Float64(-f)),
        (op, v) => Err(TesselError::type_error(format!(
            "{op} is not defined for {}",
            v.type_name()
        ))),
    }
}

fn binary_values(l: &Value, r: &Value, op: BinaryOp) -> TesselResult<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    let ord = || l.total_cmp(r);
    let value = match op {
        BinaryOp::Eq => Value::Bool(ord() == Ordering::Equal),
        BinaryOp::NotEq => Value::Bool(ord() != Ordering::Equal),
        BinaryOp::Lt => Value::Bool(ord() == Ordering::Less),
        BinaryOp::LtEq => Value::Bool(ord() != Ordering::Greater),
        BinaryOp::Gt => Value::Bool(ord() == Ordering::Greater),
        BinaryOp::GtEq => Value::Bool(ord() != Ordering::Less),
        BinaryOp::And | BinaryOp::Or => match (l, r) {
            (Value::Bool(a), Value::Bool(b)) if op == BinaryOp::And => Value::Bool(*a && *b),
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
            _ => return Err(mismatch(l, r, op)),
        },
        BinaryOp::Concat => match (l, r) {
            (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
            _ => return Err(mismatch(l, r, op)),
        },
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Modulo => {
            match (l, r) {
                (Value::Int64(a), Value::Int64(b)) => Value::Int64(int_arith(*a, *b, op)?),
                _ => match (l.as_float64(), r.as_float64()) {
                    (Some(a), Some(b)) => Value::Float64(float_arith(a, b, op)),
                    _ => return Err(mismatch(l, r, op)),
                },
            }
        }
        BinaryOp::Divide => match (l.as_float64(), r.as_float64()) {
            (Some(a), Some(b)) => Value::Float64(a / b),
            _ => return Err(mismatch(l, r, op)),
        },
    };
    Ok(value)
}

fn int_arith(a: i64, b: i64, op: BinaryOp) -> TesselResult<i64> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Modulo if b == 0 => {
            return Err(TesselError::execution("division by zero"));
        }
        BinaryOp::Modulo => a.checked_rem(b),
        _ => None,
    };
    result.ok_or_else(|| TesselError::execution(format!("integer overflow in {a} {op} {b}")))
}

fn float_arith(a: f64, b: f64, op: BinaryOp) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Modulo => a % b,
        _ => a / b,
    }
}

fn mismatch(l: &Value, r: &Value, op: BinaryOp) -> TesselError {
    TesselError::type_error(format!(
        "{} {op} {} is not defined",
        l.type_name(),
        r.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(values: Vec<Value>, dtype: DataType) -> DataBlock {
        DataBlock::from_values(values, &dtype).unwrap()
    }

    #[test]
    fn test_mixed_numeric_arithmetic() {
        let ints = block(vec![Value::Int64(1), Value::Int64(2)], DataType::Int64);
        let floats = block(vec![Value::Float64(0.5), Value::Null], DataType::Float64);
        let sum = ints.binary_op(&floats, BinaryOp::Add).unwrap();
        assert_eq!(
            sum.to_values().unwrap(),
            vec![Value::Float64(1.5), Value::Null]
        );

        let div = ints.binary_op(&ints, BinaryOp::Divide).unwrap();
        assert_eq!(div.data_type().unwrap(), DataType::Float64);
    }

    #[test]
    fn test_comparison_and_logic() {
        let a = block(vec![Value::Int64(1), Value::Int64(5)], DataType::Int64);
        let b = block(vec![Value::Float64(2.0), Value::Float64(2.0)], DataType::Float64);
        let lt = a.binary_op(&b, BinaryOp::Lt).unwrap();
        assert_eq!(
            lt.to_values().unwrap(),
            vec![Value::Bool(true), Value::Bool(false)]
        );
        let both = lt.binary_op(&lt.unary_op(UnaryOp::Not).unwrap(), BinaryOp::Or).unwrap();
        assert_eq!(
            both.to_values().unwrap(),
            vec![Value::Bool(true), Value::Bool(true)]
        );
    }

    #[test]
    fn test_generic_blocks_fall_back_to_values() {
        let objects = DataBlock::py_list(vec![
            Value::List(vec![Value::Int64(1)]),
            Value::List(vec![Value::Int64(2)]),
        ]);
        let eq = objects.binary_op(&objects.take(&[0, 0]).unwrap(), BinaryOp::Eq).unwrap();
        assert!(eq.is_arrow());
        assert_eq!(
            eq.to_values().unwrap(),
            vec![Value::Bool(true), Value::Bool(false)]
        );
        let nulls = objects.unary_op(UnaryOp::IsNull).unwrap();
        assert_eq!(nulls.to_values().unwrap(), vec![Value::Bool(false); 2]);
    }

    #[test]
    fn test_integer_modulo_by_zero_fails() {
        let a = DataBlock::py_list(vec![Value::Int64(1)]);
        let zero = DataBlock::py_list(vec![Value::Int64(0)]);
        assert!(a.binary_op(&zero, BinaryOp::Modulo).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let a = block(vec![Value::Int64(1)], DataType::Int64);
        let b = block(vec![Value::Int64(1), Value::Int64(2)], DataType::Int64);
        assert!(matches!(
            a.binary_op(&b, BinaryOp::Add),
            Err(TesselError::ValueError(_))
        ));
    }

    #[test]
    fn test_string_functions() {
        let s = block(
            vec![Value::from("apple"), Value::Null, Value::from("kiwi")],
            DataType::String,
        );
        let starts = DataBlock::call(&ScalarFunc::StartsWith("ap".into()), &[s.clone()]).unwrap();
        assert_eq!(
            starts.to_values().unwrap(),
            vec![Value::Bool(true), Value::Null, Value::Bool(false)]
        );
        let len = DataBlock::call(&ScalarFunc::Length, &[s.clone()]).unwrap();
        assert_eq!(
            len.to_values().unwrap(),
            vec![Value::Int64(5), Value::Null, Value::Int64(4)]
        );
        let concat = s.binary_op(&s, BinaryOp::Concat).unwrap();
        assert_eq!(concat.to_values().unwrap()[0], Value::from("appleapple"));
    }

    #[test]
    fn test_date_parts() {
        // 2021-03-15 is a Monday, 18701 days after the epoch.
        let d = block(vec![Value::Date(18701), Value::Null], DataType::Date);
        let year = DataBlock::call(&ScalarFunc::Year, &[d.clone()]).unwrap();
        let month = DataBlock::call(&ScalarFunc::Month, &[d.clone()]).unwrap();
        let day = DataBlock::call(&ScalarFunc::Day, &[d.clone()]).unwrap();
        let dow = DataBlock::call(&ScalarFunc::DayOfWeek, &[d]).unwrap();
        assert_eq!(year.to_values().unwrap(), vec![Value::Int64(2021), Value::Null]);
        assert_eq!(month.to_values().unwrap()[0], Value::Int64(3));
        assert_eq!(day.to_values().unwrap()[0], Value::Int64(15));
        assert_eq!(dow.to_values().unwrap()[0], Value::Int64(0));
    }

    #[test]
    fn test_if_else() {
        let cond = block(
            vec![Value::Bool(true), Value::Null, Value::Bool(false)],
            DataType::Bool,
        );
        let a = block(vec![Value::Int64(1); 3], DataType::Int64);
        let b = block(vec![Value::Float64(0.5); 3], DataType::Float64);
        let out = DataBlock::call(&ScalarFunc::IfElse, &[cond, a, b]).unwrap();
        assert_eq!(
            out.to_values().unwrap(),
            vec![Value::Float64(1.0), Value::Float64(0.5), Value::Float64(0.5)]
        );
    }

    #[test]
    fn test_cast() {
        let ints = block(vec![Value::Int64(1), Value::Null], DataType::Int64);
        let strings = ints.cast(&DataType::String).unwrap();
        assert_eq!(strings.to_values().unwrap(), vec![Value::from("1"), Value::Null]);
        let objects = ints.cast(&DataType::Object).unwrap();
        assert!(!objects.is_arrow());
        let back = objects.cast(&DataType::Int64).unwrap();
        assert!(back.is_arrow());
    }

    #[test]
    fn test_abs() {
        let ints = block(vec![Value::Int64(-3), Value::Null], DataType::Int64);
        let out = DataBlock::call(&ScalarFunc::Abs, &[ints]).unwrap();
        assert_eq!(out.to_values().unwrap(), vec![Value::Int64(3), Value::Null]);
    }
}
