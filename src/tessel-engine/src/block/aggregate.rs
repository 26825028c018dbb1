//! Reductions, grouped aggregation and hash join over blocks.

use std::collections::HashMap;

use common_error::{TesselError, TesselResult};
use tessel_core::{DataType, Value, ValueKey};
use tessel_logical::AggOp;

use super::DataBlock;

/// Running state of one aggregation over one group.
#[derive(Debug, Clone)]
enum Accumulator {
    Sum { int: i64, float: f64, seen: bool },
    Mean { sum: f64, count: usize },
    Min(Option<Value>),
    Max(Option<Value>),
    Count(i64),
}

impl Accumulator {
    fn new(op: AggOp) -> Self {
        match op {
            AggOp::Sum => Self::Sum {
                int: 0,
                float: 0.0,
                seen: false,
            },
            AggOp::Mean => Self::Mean { sum: 0.0, count: 0 },
            AggOp::Min => Self::Min(None),
            AggOp::Max => Self::Max(None),
            AggOp::Count => Self::Count(0),
        }
    }

    /// Fold one value in. Nulls are skipped by every operator.
    fn update(&mut self, value: &Value) -> TesselResult<()> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Self::Sum { int, float, seen } => {
                match value {
                    Value::Int64(i) => {
                        *int = int.checked_add(*i).ok_or_else(|| {
                            TesselError::execution("integer overflow in sum")
                        })?;
                    }
                    Value::Float64(f) => *float += f,
                    other => return Err(not_numeric("sum", other)),
                }
                *seen = true;
            }
            Self::Mean { sum, count } => {
                *sum += value
                    .as_float64()
                    .ok_or_else(|| not_numeric("mean", value))?;
                *count += 1;
            }
            Self::Min(current) => {
                if current.as_ref().map_or(true, |c| value.total_cmp(c).is_lt()) {
                    *current = Some(value.clone());
                }
            }
            Self::Max(current) => {
                if current.as_ref().map_or(true, |c| value.total_cmp(c).is_gt()) {
                    *current = Some(value.clone());
                }
            }
            Self::Count(n) => *n += 1,
        }
        Ok(())
    }

    /// Final value, shaped for a column of `result_type`.
    fn finalize(self, result_type: &DataType) -> Value {
        match self {
            Self::Sum { seen: false, .. } => Value::Null,
            Self::Sum { int, float, .. } => match result_type {
                DataType::Float64 => Value::Float64(float + int as f64),
                _ => Value::Int64(int),
            },
            Self::Mean { count: 0, .. } => Value::Null,
            Self::Mean { sum, count } => Value::Float64(sum / count as f64),
            Self::Min(v) | Self::Max(v) => v.unwrap_or(Value::Null),
            Self::Count(n) => Value::Int64(n),
        }
    }
}

fn not_numeric(op: &str, value: &Value) -> TesselError {
    TesselError::type_error(format!("{op} requires numeric input, got {}", value.type_name()))
}

fn agg_result_type(block: &DataBlock, op: AggOp) -> TesselResult<DataType> {
    let input = block.data_type()?;
    op.result_type(&input).ok_or_else(|| {
        TesselError::type_resolution(format!("{op} is not defined for {input}"))
    })
}

/// Cast each left/right key pair to its common supertype.
fn comparable_keys(
    left: &[DataBlock],
    right: &[DataBlock],
) -> TesselResult<(Vec<DataBlock>, Vec<DataBlock>)> {
    let mut left_out = Vec::with_capacity(left.len());
    let mut right_out = Vec::with_capacity(right.len());
    for (l, r) in left.iter().zip(right) {
        let (lt, rt) = (l.data_type()?, r.data_type()?);
        if lt == rt {
            left_out.push(l.clone());
            right_out.push(r.clone());
            continue;
        }
        let common = lt.common_supertype(&rt).ok_or_else(|| {
            TesselError::type_error(format!("cannot join {lt} keys with {rt} keys"))
        })?;
        if common == DataType::Object {
            left_out.push(l.clone());
            right_out.push(r.clone());
        } else {
            log::trace!("join keys {lt} and {rt} compared as {common}");
            left_out.push(l.cast(&common)?);
            right_out.push(r.cast(&common)?);
        }
    }
    Ok((left_out, right_out))
}

fn row_keys(keys: &[DataBlock]) -> TesselResult<Vec<Vec<ValueKey>>> {
    let Some(first) = keys.first() else {
        return Err(TesselError::value_error("at least one key block is required"));
    };
    let num_rows = first.len();
    let columns = keys
        .iter()
        .map(|k| {
            if k.len() == num_rows {
                k.to_values()
            } else {
                Err(TesselError::value_error(format!(
                    "key blocks have different lengths: {} vs {}",
                    num_rows,
                    k.len()
                )))
            }
        })
        .collect::<TesselResult<Vec<_>>>()?;
    Ok((0..num_rows)
        .map(|row| columns.iter().map(|c| ValueKey(c[row].clone())).collect())
        .collect())
}

impl DataBlock {
    /// Reduce the block to a single value.
    pub fn aggregate(&self, op: AggOp) -> TesselResult<Self> {
        let result_type = agg_result_type(self, op)?;
        let mut acc = Accumulator::new(op);
        for value in self.to_values()? {
            acc.update(&value)?;
        }
        Self::from_values(vec![acc.finalize(&result_type)], &result_type)
    }

    /// Grouped aggregation.
    ///
    /// Rows are grouped by the tuple of key values; a null key is a group of
    /// its own. Groups come out in the order their first row appears. Returns
    /// one block per key (one row per group) and one block per value column
    /// reduced by the matching operator.
    pub fn group_by_aggregate(
        keys: &[Self],
        values: &[Self],
        ops: &[AggOp],
    ) -> TesselResult<(Vec<Self>, Vec<Self>)> {
        if values.len() != ops.len() {
            return Err(TesselError::value_error(format!(
                "{} value blocks for {} aggregations",
                values.len(),
                ops.len()
            )));
        }
        let rows = row_keys(keys)?;
        if let Some(bad) = values.iter().find(|v| v.len() != rows.len()) {
            return Err(TesselError::value_error(format!(
                "value block of length {} for {} key rows",
                bad.len(),
                rows.len()
            )));
        }

        let mut group_of: HashMap<Vec<ValueKey>, usize> = HashMap::new();
        let mut group_rows: Vec<Vec<usize>> = Vec::new();
        for (row, key) in rows.into_iter().enumerate() {
            let next = group_rows.len();
            let group = *group_of.entry(key).or_insert(next);
            if group == next {
                group_rows.push(Vec::new());
            }
            group_rows[group].push(row);
        }
        log::debug!(
            "grouped aggregation: {} rows into {} groups",
            keys[0].len(),
            group_rows.len()
        );

        let first_rows: Vec<usize> = group_rows.iter().map(|rows| rows[0]).collect();
        let key_blocks = keys
            .iter()
            .map(|k| k.take(&first_rows))
            .collect::<TesselResult<Vec<_>>>()?;

        let value_blocks = values
            .iter()
            .zip(ops)
            .map(|(block, &op)| {
                let result_type = agg_result_type(block, op)?;
                let column = block.to_values()?;
                let reduced = group_rows
                    .iter()
                    .map(|rows| {
                        let mut acc = Accumulator::new(op);
                        for &row in rows {
                            acc.update(&column[row])?;
                        }
                        Ok(acc.finalize(&result_type))
                    })
                    .collect::<TesselResult<Vec<_>>>()?;
                Self::from_values(reduced, &result_type)
            })
            .collect::<TesselResult<Vec<_>>>()?;

        Ok((key_blocks, value_blocks))
    }

    /// Inner hash join.
    ///
    /// Returns, in order, the left key blocks, the left remaining blocks and
    /// the right remaining blocks, gathered for every matching row pair.
    /// Rows with a null in any key never match. Key pairs of different types
    /// are compared in their common supertype, so `1` matches `1.0`; the
    /// output keeps the left key values as they were. Output follows left row
    /// order, then right row order within one left row.
    pub fn join(
        left_keys: &[Self],
        right_keys: &[Self],
        left_rest: &[Self],
        right_rest: &[Self],
    ) -> TesselResult<Vec<Self>> {
        if left_keys.len() != right_keys.len() {
            return Err(TesselError::value_error(format!(
                "join on {} left keys and {} right keys",
                left_keys.len(),
                right_keys.len()
            )));
        }
        let (left_cmp, right_cmp) = comparable_keys(left_keys, right_keys)?;
        let left_rows = row_keys(&left_cmp)?;
        let right_rows = row_keys(&right_cmp)?;

        let mut table: HashMap<&[ValueKey], Vec<usize>> = HashMap::new();
        for (row, key) in right_rows.iter().enumerate() {
            if key.iter().any(|k| k.0.is_null()) {
                continue;
            }
            table.entry(key.as_slice()).or_default().push(row);
        }

        let mut left_idx = Vec::new();
        let mut right_idx = Vec::new();
        for (row, key) in left_rows.iter().enumerate() {
            if key.iter().any(|k| k.0.is_null()) {
                continue;
            }
            if let Some(matches) = table.get(key.as_slice()) {
                for &m in matches {
                    left_idx.push(row);
                    right_idx.push(m);
                }
            }
        }
        log::debug!(
            "hash join: {} x {} rows -> {} rows",
            left_rows.len(),
            right_rows.len(),
            left_idx.len()
        );

        left_keys
            .iter()
            .chain(left_rest)
            .map(|b| b.take(&left_idx))
            .chain(right_rest.iter().map(|b| b.take(&right_idx)))
            .collect()
    }
}
