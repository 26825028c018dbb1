//! Column data blocks and the operators over them.
//!
//! A [`DataBlock`] holds the values of one column of one partition. Blocks are
//! immutable; every operator returns a new block. Vectorizable data lives in
//! an Arrow array, anything else in a generic value list. Both variants honor
//! the same operator set.

mod aggregate;
mod convert;
mod ops;

use std::sync::Arc;

use arrow::array::{new_empty_array, Array, ArrayRef, UInt64Array};
use arrow::compute::{self, SortOptions};

use common_error::{TesselError, TesselResult};
use tessel_core::{DataType, Value};

pub(crate) use convert::{array_to_values, values_to_array};

/// Values of one column.
#[derive(Debug, Clone)]
pub enum DataBlock {
    /// Vector-engine block.
    Arrow(ArrayRef),
    /// Generic block of opaque values.
    PyList(Arc<Vec<Value>>),
}

impl DataBlock {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Wrap an Arrow array, normalizing it to its canonical Arrow type.
    pub fn from_arrow(array: ArrayRef) -> TesselResult<Self> {
        let canonical = convert::canonical_arrow_type(array.data_type())?;
        if *array.data_type() == canonical {
            Ok(Self::Arrow(array))
        } else {
            Ok(Self::Arrow(compute::cast(&array, &canonical)?))
        }
    }

    /// Wrap values in a generic block.
    pub fn py_list(values: Vec<Value>) -> Self {
        Self::PyList(Arc::new(values))
    }

    /// Build a block of the given type.
    ///
    /// Vectorizable types produce an Arrow block; `Object` produces a generic
    /// block. Values must conform to `dtype`.
    pub fn from_values(values: Vec<Value>, dtype: &DataType) -> TesselResult<Self> {
        if dtype.is_vectorizable() {
            Ok(Self::Arrow(values_to_array(&values, dtype)?))
        } else {
            Ok(Self::py_list(values))
        }
    }

    /// Build a block, inferring its type from the values.
    pub fn from_inferred_values(values: Vec<Value>) -> TesselResult<Self> {
        let dtype = convert::infer_data_type(&values);
        Self::from_values(values, &dtype)
    }

    /// A block repeating `value` `len` times.
    pub fn full(value: &Value, len: usize) -> TesselResult<Self> {
        Self::from_values(vec![value.clone(); len], &value.data_type())
    }

    /// An empty block of the given type.
    pub fn empty(dtype: &DataType) -> Self {
        match dtype.to_arrow() {
            Some(arrow_type) => Self::Arrow(new_empty_array(&arrow_type)),
            None => Self::py_list(Vec::new()),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Arrow(array) => array.len(),
            Self::PyList(values) => values.len(),
        }
    }

    /// Whether the block has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this block lives in the vector engine.
    pub fn is_arrow(&self) -> bool {
        matches!(self, Self::Arrow(_))
    }

    /// The Arrow array, if this is a vector-engine block.
    pub fn as_arrow(&self) -> Option<&ArrayRef> {
        match self {
            Self::Arrow(array) => Some(array),
            Self::PyList(_) => None,
        }
    }

    /// Type of the values. Generic blocks are always `Object`.
    pub fn data_type(&self) -> TesselResult<DataType> {
        match self {
            Self::Arrow(array) => DataType::from_arrow(array.data_type()),
            Self::PyList(_) => Ok(DataType::Object),
        }
    }

    /// Every value of the block.
    pub fn to_values(&self) -> TesselResult<Vec<Value>> {
        match self {
            Self::Arrow(array) => array_to_values(array.as_ref()),
            Self::PyList(values) => Ok(values.as_ref().clone()),
        }
    }

    /// Export as an Arrow array.
    ///
    /// Generic blocks are rendered as strings.
    pub fn to_arrow(&self) -> TesselResult<ArrayRef> {
        match self {
            Self::Arrow(array) => Ok(array.clone()),
            Self::PyList(values) => {
                let rendered: Vec<Value> = values
                    .iter()
                    .map(|v| match v {
                        Value::Null => Value::Null,
                        other => Value::String(other.to_string()),
                    })
                    .collect();
                values_to_array(&rendered, &DataType::String)
            }
        }
    }

    /// Approximate memory footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Arrow(array) => array.get_array_memory_size(),
            Self::PyList(values) => {
                values.len() * std::mem::size_of::<Value>()
                    + values
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.len(),
                            Value::Binary(b) => b.len(),
                            _ => 0,
                        })
                        .sum::<usize>()
            }
        }
    }

    // ========================================================================
    // Row selection
    // ========================================================================

    /// Gather rows by index.
    pub fn take(&self, indices: &[usize]) -> TesselResult<Self> {
        let len = self.len();
        if let Some(bad) = indices.iter().find(|&&i| i >= len) {
            return Err(TesselError::value_error(format!(
                "take index {bad} out of bounds for block of length {len}"
            )));
        }
        match self {
            Self::Arrow(array) => {
                let idx = UInt64Array::from_iter_values(indices.iter().map(|&i| i as u64));
                Ok(Self::Arrow(compute::take(array.as_ref(), &idx, None)?))
            }
            Self::PyList(values) => Ok(Self::py_list(
                indices.iter().map(|&i| values[i].clone()).collect(),
            )),
        }
    }

    /// Keep the rows where `mask` is true. Null mask entries drop the row.
    pub fn filter(&self, mask: &Self) -> TesselResult<Self> {
        if mask.len() != self.len() {
            return Err(TesselError::value_error(format!(
                "mask of length {} cannot filter block of length {}",
                mask.len(),
                self.len()
            )));
        }
        let mask = ops::as_boolean_array(mask)?;
        match self {
            Self::Arrow(array) => Ok(Self::Arrow(compute::filter(array.as_ref(), &mask)?)),
            Self::PyList(values) => Ok(Self::py_list(
                values
                    .iter()
                    .zip(mask.iter())
                    .filter(|(_, keep)| *keep == Some(true))
                    .map(|(v, _)| v.clone())
                    .collect(),
            )),
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        match self {
            Self::Arrow(array) => Self::Arrow(array.slice(0, n)),
            Self::PyList(values) => Self::py_list(values[..n].to_vec()),
        }
    }

    /// Permutation that sorts the block. Nulls sort last.
    pub fn argsort(&self, descending: bool) -> TesselResult<Vec<usize>> {
        match self {
            Self::Arrow(array) => {
                let options = SortOptions {
                    descending,
                    nulls_first: false,
                };
                let indices = compute::sort_to_indices(array.as_ref(), Some(options), None)?;
                Ok(indices.values().iter().map(|&i| i as usize).collect())
            }
            Self::PyList(values) => {
                let mut indices: Vec<usize> = (0..values.len()).collect();
                indices.sort_by(|&a, &b| {
                    let (va, vb) = (&values[a], &values[b]);
                    match (va.is_null(), vb.is_null()) {
                        (true, true) => std::cmp::Ordering::Equal,
                        (true, false) => std::cmp::Ordering::Greater,
                        (false, true) => std::cmp::Ordering::Less,
                        (false, false) if descending => vb.total_cmp(va),
                        (false, false) => va.total_cmp(vb),
                    }
                });
                Ok(indices)
            }
        }
    }

    // ========================================================================
    // Hashing and splitting
    // ========================================================================

    /// Per-row shuffle hash.
    ///
    /// `seed` chains a previous column's hashes into this one so multi-column
    /// keys fold into one hash. Hashing is value-based: a value hashes the
    /// same in either block variant and in every process.
    pub fn hash(&self, seed: Option<&[u64]>) -> TesselResult<Vec<u64>> {
        if let Some(seed) = seed {
            if seed.len() != self.len() {
                return Err(TesselError::value_error(format!(
                    "hash seed of length {} for block of length {}",
                    seed.len(),
                    self.len()
                )));
            }
        }
        Ok(self
            .to_values()?
            .iter()
            .enumerate()
            .map(|(i, v)| v.shuffle_hash(seed.map(|s| s[i])))
            .collect())
    }

    /// Split into `n` blocks: row `i` goes to block `targets[i]`.
    ///
    /// Relative row order within each output block is preserved; output
    /// blocks may be empty.
    pub fn partition_split(&self, n: usize, targets: &[usize]) -> TesselResult<Vec<Self>> {
        if targets.len() != self.len() {
            return Err(TesselError::value_error(format!(
                "{} split targets for block of length {}",
                targets.len(),
                self.len()
            )));
        }
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (row, &target) in targets.iter().enumerate() {
            let bucket = buckets.get_mut(target).ok_or_else(|| {
                TesselError::value_error(format!("split target {target} out of range 0..{n}"))
            })?;
            bucket.push(row);
        }
        buckets.iter().map(|rows| self.take(rows)).collect()
    }

    /// Concatenate blocks in order.
    ///
    /// Arrow blocks of one type concatenate in the vector engine; any other
    /// mix is rebuilt from values.
    pub fn merge(blocks: &[Self]) -> TesselResult<Self> {
        let Some(first) = blocks.first() else {
            return Err(TesselError::value_error("cannot merge zero blocks"));
        };
        if blocks.len() == 1 {
            return Ok(first.clone());
        }

        let arrays: Option<Vec<&dyn Array>> = blocks
            .iter()
            .map(|b| b.as_arrow().map(|a| a.as_ref()))
            .collect();
        if let Some(arrays) = arrays {
            let dtype = arrays[0].data_type();
            if arrays.iter().all(|a| a.data_type() == dtype) {
                return Ok(Self::Arrow(compute::concat(&arrays)?));
            }
        }

        let mut values = Vec::with_capacity(blocks.iter().map(Self::len).sum());
        for block in blocks {
            values.extend(block.to_values()?);
        }
        if blocks.iter().any(|b| !b.is_arrow()) {
            Ok(Self::py_list(values))
        } else {
            Self::from_inferred_values(values)
        }
    }
}
