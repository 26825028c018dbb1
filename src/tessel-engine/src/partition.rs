//! Partitions: the unit of parallel computation.
//!
//! A [`VPartition`] maps column identities to tiles of equal length. Every
//! operation returns a new, fully validated partition; partitions are never
//! mutated in place, so they can be shared read-only between consumers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common_error::{ensure, structural_err, TesselError, TesselResult};
use tessel_core::{ColumnId, DataType, PartId, Value};
use tessel_logical::{AggOp, BinaryOp, Expression, ExpressionList};

use crate::block::DataBlock;
use crate::expr::ExprEvaluator;
use crate::tile::PyListTile;

/// Join mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// Rows with a match on both sides.
    #[default]
    Inner,
    /// Every left row.
    Left,
    /// Every right row.
    Right,
    /// Every row of both sides.
    Outer,
}

impl FromStr for JoinType {
    type Err = TesselError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(Self::Inner),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "outer" => Ok(Self::Outer),
            other => Err(TesselError::invalid_parameter(format!(
                "unknown join type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inner => write!(f, "inner"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Outer => write!(f, "outer"),
        }
    }
}

/// One partition of a dataset.
#[derive(Debug, Clone)]
pub struct VPartition {
    partition_id: PartId,
    columns: BTreeMap<ColumnId, PyListTile>,
}

impl VPartition {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Build a partition, checking its structural invariants.
    ///
    /// Every tile must be stored under its own column id, carry
    /// `partition_id`, and have the same length as every other tile.
    pub fn try_new(
        columns: BTreeMap<ColumnId, PyListTile>,
        partition_id: PartId,
    ) -> TesselResult<Self> {
        let mut expected_len = None;
        for (id, tile) in &columns {
            ensure!(
                tile.column_id == *id,
                StructuralInvariant: "mismatch of column id: tile {} stored under {}",
                tile.column_id,
                id
            );
            ensure!(
                tile.partition_id == partition_id,
                StructuralInvariant: "mismatch of partition id: tile '{}' has {}, partition has {}",
                tile.column_name,
                tile.partition_id,
                partition_id
            );
            match expected_len {
                None => expected_len = Some(tile.len()),
                Some(len) if len != tile.len() => structural_err!(
                    "mismatch of tile lengths: {} vs {} for column '{}'",
                    len,
                    tile.len(),
                    tile.column_name
                ),
                Some(_) => {}
            }
        }
        Ok(Self {
            partition_id,
            columns,
        })
    }

    /// Build a partition from a list of tiles. Column ids must be distinct.
    pub fn from_tiles(tiles: Vec<PyListTile>, partition_id: PartId) -> TesselResult<Self> {
        let mut columns = BTreeMap::new();
        for tile in tiles {
            if let Some(prev) = columns.insert(tile.column_id, tile) {
                structural_err!(
                    "column {} ('{}') appears more than once",
                    prev.column_id,
                    prev.column_name
                );
            }
        }
        Self::try_new(columns, partition_id)
    }

    /// A partition with no columns.
    pub fn empty(partition_id: PartId) -> Self {
        Self {
            partition_id,
            columns: BTreeMap::new(),
        }
    }

    /// Bind the columns of a record batch to externally resolved identities.
    ///
    /// `column_ids[i]` names the i-th column of `batch`.
    pub fn from_arrow_table(
        batch: &RecordBatch,
        column_ids: &[ColumnId],
        partition_id: PartId,
    ) -> TesselResult<Self> {
        ensure!(
            column_ids.len() == batch.num_columns(),
            ValueError: "{} column ids for a table of {} columns",
            column_ids.len(),
            batch.num_columns()
        );
        let schema = batch.schema();
        let tiles = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .zip(column_ids)
            .map(|((field, array), &id)| {
                Ok(PyListTile::new(
                    id,
                    field.name().clone(),
                    partition_id,
                    DataBlock::from_arrow(Arc::clone(array))?,
                ))
            })
            .collect::<TesselResult<Vec<_>>>()?;
        Self::from_tiles(tiles, partition_id)
    }

    /// Bind named value sequences to the resolved columns of `schema`.
    ///
    /// Columns whose resolved type is `Object` stay generic value lists;
    /// every other column goes to the vector engine.
    pub fn from_pydict(
        data: &HashMap<String, Vec<Value>>,
        schema: &ExpressionList,
        partition_id: PartId,
    ) -> TesselResult<Self> {
        ensure!(
            data.len() == schema.len(),
            ValueError: "{} columns of data for a schema of {} columns",
            data.len(),
            schema.len()
        );
        let tiles = schema
            .iter()
            .zip(schema.names())
            .map(|(expr, name)| {
                let id = expr.id().ok_or_else(|| {
                    TesselError::unresolved_column(format!("schema column '{name}' is unresolved"))
                })?;
                let values = data.get(name).ok_or_else(|| {
                    TesselError::not_found(format!("no data for column '{name}'"))
                })?;
                let block = match expr.resolved_type()? {
                    DataType::Object => DataBlock::py_list(values.clone()),
                    dtype => DataBlock::from_values(values.clone(), &dtype)?,
                };
                Ok(PyListTile::new(id, name.as_str(), partition_id, block))
            })
            .collect::<TesselResult<Vec<_>>>()?;
        Self::from_tiles(tiles, partition_id)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Index of this partition.
    pub fn partition_id(&self) -> PartId {
        self.partition_id
    }

    /// Number of rows; zero for a partition without columns.
    ///
    /// Operations that depend on the row count go through [`Self::num_rows`]
    /// instead, which refuses a partition without columns.
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, PyListTile::len)
    }

    /// Whether the partition has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows, failing for a partition without columns.
    pub fn num_rows(&self) -> TesselResult<usize> {
        match self.columns.values().next() {
            Some(tile) => Ok(tile.len()),
            None => Err(TesselError::structural(format!(
                "partition {} has no columns, so its length is undefined",
                self.partition_id
            ))),
        }
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column identities in ascending order.
    pub fn column_ids(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.columns.keys().copied()
    }

    /// The tile of one column.
    pub fn get_tile(&self, id: ColumnId) -> Option<&PyListTile> {
        self.columns.get(&id)
    }

    /// Every tile, in ascending column id order.
    pub fn tiles(&self) -> impl Iterator<Item = &PyListTile> {
        self.columns.values()
    }

    /// Approximate memory held by this partition's values.
    pub fn size_bytes(&self) -> usize {
        self.columns.values().map(|t| t.block.size_bytes()).sum()
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    fn evaluator_env(&self, expr: &Expression) -> TesselResult<HashMap<ColumnId, DataBlock>> {
        let mut env = HashMap::new();
        for column in expr.required_columns(false) {
            let id = column.id().ok_or_else(|| {
                TesselError::unresolved_column(format!("column {column} is unresolved"))
            })?;
            let tile = self.columns.get(&id).ok_or_else(|| {
                TesselError::execution(format!(
                    "column {column} is not present in partition {}",
                    self.partition_id
                ))
            })?;
            env.insert(id, tile.block.clone());
        }
        Ok(env)
    }

    fn eval_named(&self, expr: &Expression, name: &str) -> TesselResult<PyListTile> {
        let id = expr.id().ok_or_else(|| {
            TesselError::unresolved_column(format!("expression {expr} must be resolved first"))
        })?;

        if !expr.has_call() {
            let tile = self.columns.get(&id).ok_or_else(|| {
                TesselError::execution(format!(
                    "column {expr} is not present in partition {}",
                    self.partition_id
                ))
            })?;
            if tile.column_name == name {
                return Ok(tile.clone());
            }
            return Ok(PyListTile {
                column_name: name.to_string(),
                ..tile.clone()
            });
        }

        let num_rows = self.num_rows()?;
        let env = self.evaluator_env(expr)?;
        let block = ExprEvaluator::new(&env, num_rows).evaluate(expr)?;
        ensure!(
            block.len() == num_rows,
            StructuralInvariant: "{} evaluated to {} rows in a partition of {} rows",
            expr,
            block.len(),
            num_rows
        );
        Ok(PyListTile::new(id, name, self.partition_id, block))
    }

    /// Evaluate one resolved expression to a tile under its own identity.
    ///
    /// A bare column reference passes the existing tile through.
    pub fn eval_expression(&self, expr: &Expression) -> TesselResult<PyListTile> {
        let name = match expr.name() {
            Some(name) => name.to_string(),
            None => expr.id().map(|id| id.to_string()).unwrap_or_default(),
        };
        self.eval_named(expr, &name)
    }

    /// Evaluate every entry of a resolved list into a new partition.
    ///
    /// This is how projections, renames and computed columns are built.
    pub fn eval_expression_list(&self, exprs: &ExpressionList) -> TesselResult<Self> {
        let tiles = exprs
            .iter()
            .zip(exprs.names())
            .map(|(expr, name)| self.eval_named(expr, name))
            .collect::<TesselResult<Vec<_>>>()?;
        Self::from_tiles(tiles, self.partition_id)
    }

    /// Apply `f` to the block of every column.
    pub fn for_each_column_block<F>(&self, f: F) -> TesselResult<Self>
    where
        F: Fn(&DataBlock) -> TesselResult<DataBlock>,
    {
        let columns = self
            .columns
            .iter()
            .map(|(id, tile)| Ok((*id, tile.apply(&f)?)))
            .collect::<TesselResult<BTreeMap<_, _>>>()?;
        Self::try_new(columns, self.partition_id)
    }

    // ========================================================================
    // Row operations
    // ========================================================================

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> TesselResult<Self> {
        self.for_each_column_block(|block| Ok(block.head(n)))
    }

    /// `n` rows drawn uniformly with replacement.
    ///
    /// With `seed` the draw is reproducible. An empty partition samples to an
    /// empty partition.
    pub fn sample(&self, n: usize, seed: Option<u64>) -> TesselResult<Self> {
        let len = self.num_rows()?;
        if len == 0 {
            return self.head(0);
        }
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..len)).collect();
        self.take(&indices)
    }

    /// Keep rows where every predicate holds.
    pub fn filter(&self, predicates: &ExpressionList) -> TesselResult<Self> {
        ensure!(
            !predicates.is_empty(),
            ValueError: "filter requires at least one predicate"
        );
        let num_rows = self.num_rows()?;
        let mut mask: Option<DataBlock> = None;
        for predicate in predicates {
            let env = self.evaluator_env(predicate)?;
            let next = ExprEvaluator::new(&env, num_rows).evaluate_predicate(predicate)?;
            mask = Some(match mask {
                None => next,
                Some(prev) => prev.binary_op(&next, BinaryOp::And)?,
            });
        }
        let Some(mask) = mask else {
            return Err(TesselError::internal("filter produced no mask"));
        };
        self.for_each_column_block(|block| block.filter(&mask))
    }

    /// Reorder rows by one sort key. Nulls sort last.
    pub fn sort(&self, sort_key: &Expression, descending: bool) -> TesselResult<Self> {
        self.num_rows()?;
        let key = self.eval_expression(sort_key)?;
        let order = key.block.argsort(descending)?;
        self.take(&order)
    }

    /// Gather rows by index.
    pub fn take(&self, indices: &[usize]) -> TesselResult<Self> {
        self.num_rows()?;
        self.for_each_column_block(|block| block.take(indices))
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Aggregate columns, optionally grouped.
    ///
    /// Without `group_by`, every target reduces to a single row. With it, the
    /// result has one row per distinct key (in first-seen order) holding the
    /// key columns followed by the aggregated columns.
    pub fn agg(
        &self,
        to_agg: &[(Expression, AggOp)],
        group_by: Option<&ExpressionList>,
    ) -> TesselResult<Self> {
        let evaluated = to_agg
            .iter()
            .map(|(expr, op)| Ok((self.eval_expression(expr)?, *op)))
            .collect::<TesselResult<Vec<_>>>()?;

        let Some(group_by) = group_by else {
            let tiles = evaluated
                .iter()
                .map(|(tile, op)| tile.apply(|block| block.aggregate(*op)))
                .collect::<TesselResult<Vec<_>>>()?;
            return Self::from_tiles(tiles, self.partition_id);
        };

        let key_tiles = group_by
            .iter()
            .zip(group_by.names())
            .map(|(expr, name)| self.eval_named(expr, name))
            .collect::<TesselResult<Vec<_>>>()?;
        let key_blocks: Vec<DataBlock> = key_tiles.iter().map(|t| t.block.clone()).collect();
        let value_blocks: Vec<DataBlock> = evaluated.iter().map(|(t, _)| t.block.clone()).collect();
        let ops: Vec<AggOp> = evaluated.iter().map(|(_, op)| *op).collect();

        let (keys, values) = DataBlock::group_by_aggregate(&key_blocks, &value_blocks, &ops)?;
        let tiles = key_tiles
            .iter()
            .zip(keys)
            .chain(evaluated.iter().map(|(t, _)| t).zip(values))
            .map(|(tile, block)| tile.replace_block(block))
            .collect();
        Self::from_tiles(tiles, self.partition_id)
    }

    // ========================================================================
    // Shuffle
    // ========================================================================

    /// Bucket index of every row for a hash shuffle into `n` partitions.
    ///
    /// Key columns are hashed in ascending identity order so the same key
    /// lands in the same bucket on every worker.
    pub fn hash_targets(&self, exprs: &ExpressionList, n: usize) -> TesselResult<Vec<usize>> {
        ensure!(n > 0, ValueError: "cannot split into 0 partitions");
        ensure!(
            !exprs.is_empty(),
            ValueError: "hash split requires at least one key"
        );
        self.num_rows()?;
        let keys = self.eval_expression_list(exprs)?;
        let mut hashes: Option<Vec<u64>> = None;
        for tile in keys.columns.values() {
            hashes = Some(tile.block.hash(hashes.as_deref())?);
        }
        Ok(hashes
            .unwrap_or_default()
            .into_iter()
            .map(|h| (h % n as u64) as usize)
            .collect())
    }

    /// Split rows into `n` partitions by the hash of `exprs`.
    pub fn split_by_hash(&self, exprs: &ExpressionList, n: usize) -> TesselResult<Vec<Self>> {
        let targets = self.hash_targets(exprs, n)?;
        log::debug!(
            "partition {}: hash split of {} rows on {} into {} buckets",
            self.partition_id,
            targets.len(),
            exprs,
            n
        );
        self.split_by_index(n, &targets)
    }

    /// Split rows into `n` partitions: row `i` goes to `targets[i]`.
    ///
    /// Output partition `j` has id `j`.
    pub fn split_by_index(&self, n: usize, targets: &[usize]) -> TesselResult<Vec<Self>> {
        let num_rows = self.num_rows()?;
        ensure!(
            targets.len() == num_rows,
            ValueError: "{} split targets for a partition of {} rows",
            targets.len(),
            num_rows
        );
        let mut outputs: Vec<BTreeMap<ColumnId, PyListTile>> = vec![BTreeMap::new(); n];
        for (id, tile) in &self.columns {
            for (out, piece) in outputs.iter_mut().zip(tile.split_by_index(n, targets)?) {
                out.insert(*id, piece);
            }
        }
        outputs
            .into_iter()
            .enumerate()
            .map(|(pid, columns)| Self::try_new(columns, pid))
            .collect()
    }

    /// Concatenate partitions that share one column set.
    ///
    /// Tiles are merged column by column in input order. A single partition is
    /// returned as is.
    pub fn merge_partitions(to_merge: Vec<Self>, verify_partition_id: bool) -> TesselResult<Self> {
        ensure!(
            !to_merge.is_empty(),
            ValueError: "need at least 1 partition to merge"
        );
        if to_merge.len() == 1 {
            return to_merge
                .into_iter()
                .next()
                .ok_or_else(|| TesselError::internal("partition vanished during merge"));
        }

        let pid = to_merge[0].partition_id;
        let col_ids: BTreeSet<ColumnId> = to_merge[0].column_ids().collect();
        for part in &to_merge[1..] {
            ensure!(
                !verify_partition_id || part.partition_id == pid,
                StructuralInvariant: "mismatch of partition id: {} vs {}",
                pid,
                part.partition_id
            );
            let ids: BTreeSet<ColumnId> = part.column_ids().collect();
            ensure!(
                ids == col_ids,
                StructuralInvariant: "mismatch of column ids in partition {}: {:?} vs {:?}",
                part.partition_id,
                col_ids,
                ids
            );
        }

        let num_parts = to_merge.len();
        let mut per_column: BTreeMap<ColumnId, Vec<PyListTile>> = BTreeMap::new();
        for part in to_merge {
            for (id, mut tile) in part.columns {
                tile.partition_id = pid;
                per_column.entry(id).or_default().push(tile);
            }
        }
        let columns = per_column
            .into_iter()
            .map(|(id, tiles)| Ok((id, PyListTile::merge_tiles(tiles, false)?)))
            .collect::<TesselResult<BTreeMap<_, _>>>()?;
        let merged = Self::try_new(columns, pid)?;
        log::debug!(
            "merged {} partitions into partition {} of {} rows",
            num_parts,
            pid,
            merged.len()
        );
        Ok(merged)
    }

    // ========================================================================
    // Join
    // ========================================================================

    /// Join with `right` on key expressions, then project `output_schema`.
    ///
    /// Only inner joins are supported. Before projection the joined columns
    /// are the left keys, the left non-key columns and the right non-key
    /// columns, each under its original identity.
    pub fn join(
        &self,
        right: &Self,
        left_on: &ExpressionList,
        right_on: &ExpressionList,
        output_schema: &ExpressionList,
        how: JoinType,
    ) -> TesselResult<Self> {
        if how != JoinType::Inner {
            return Err(TesselError::unsupported_join(format!(
                "{how} join is not supported, only inner"
            )));
        }
        ensure!(
            left_on.len() == right_on.len(),
            ValueError: "join on {} left keys and {} right keys",
            left_on.len(),
            right_on.len()
        );

        let left_keys = self.eval_expression_list(left_on)?;
        let right_keys = right.eval_expression_list(right_on)?;
        let left_key_tiles = left_on
            .iter()
            .map(|e| key_tile(&left_keys, e))
            .collect::<TesselResult<Vec<_>>>()?;
        let right_key_blocks = right_on
            .iter()
            .map(|e| Ok(key_tile(&right_keys, e)?.block.clone()))
            .collect::<TesselResult<Vec<_>>>()?;

        let left_rest: Vec<&PyListTile> = self
            .columns
            .iter()
            .filter(|(id, _)| !left_keys.columns.contains_key(id))
            .map(|(_, t)| t)
            .collect();
        let right_rest: Vec<&PyListTile> = right
            .columns
            .iter()
            .filter(|(id, _)| !right_keys.columns.contains_key(id))
            .map(|(_, t)| t)
            .collect();

        let left_key_blocks: Vec<DataBlock> =
            left_key_tiles.iter().map(|t| t.block.clone()).collect();
        let left_rest_blocks: Vec<DataBlock> = left_rest.iter().map(|t| t.block.clone()).collect();
        let right_rest_blocks: Vec<DataBlock> =
            right_rest.iter().map(|t| t.block.clone()).collect();
        let joined = DataBlock::join(
            &left_key_blocks,
            &right_key_blocks,
            &left_rest_blocks,
            &right_rest_blocks,
        )?;

        let sources: Vec<&PyListTile> = left_key_tiles
            .iter()
            .copied()
            .chain(left_rest)
            .chain(right_rest)
            .collect();
        ensure!(
            sources.len() == joined.len(),
            InternalError: "join produced {} columns for {} inputs",
            joined.len(),
            sources.len()
        );
        let tiles = sources
            .into_iter()
            .zip(joined)
            .map(|(tile, block)| PyListTile {
                partition_id: self.partition_id,
                ..tile.replace_block(block)
            })
            .collect();
        let intermediate = Self::from_tiles(tiles, self.partition_id)?;
        log::debug!(
            "partition {}: joined {} x {} rows into {} rows",
            self.partition_id,
            self.len(),
            right.len(),
            intermediate.len()
        );
        intermediate.eval_expression_list(output_schema)
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Convert to a record batch.
    ///
    /// With `schema`, columns follow its order and names. Without it, columns
    /// come in ascending identity order under their tile names. Generic
    /// columns are rendered as strings.
    pub fn to_record_batch(&self, schema: Option<&ExpressionList>) -> TesselResult<RecordBatch> {
        let tiles: Vec<(&PyListTile, &str)> = match schema {
            Some(schema) => schema
                .iter()
                .zip(schema.names())
                .map(|(expr, name)| {
                    let id = expr.id().ok_or_else(|| {
                        TesselError::unresolved_column(format!("schema column '{name}' is unresolved"))
                    })?;
                    let tile = self.columns.get(&id).ok_or_else(|| {
                        TesselError::not_found(format!(
                            "column '{name}' ({id}) is not in partition {}",
                            self.partition_id
                        ))
                    })?;
                    Ok((tile, name.as_str()))
                })
                .collect::<TesselResult<Vec<_>>>()?,
            None => self
                .columns
                .values()
                .map(|t| (t, t.column_name.as_str()))
                .collect(),
        };

        let mut fields = Vec::with_capacity(tiles.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(tiles.len());
        for (tile, name) in tiles {
            let array = tile.block.to_arrow()?;
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }
        let options = RecordBatchOptions::new().with_row_count(Some(self.len()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?)
    }
}

fn key_tile<'a>(keys: &'a VPartition, expr: &Expression) -> TesselResult<&'a PyListTile> {
    let id = expr
        .id()
        .ok_or_else(|| TesselError::unresolved_column(format!("join key {expr} is unresolved")))?;
    keys.columns
        .get(&id)
        .ok_or_else(|| TesselError::internal(format!("join key {expr} was not evaluated")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_logical::{col, lit};

    fn source_schema() -> ExpressionList {
        ExpressionList::new(vec![
            Expression::typed_column("g", DataType::String),
            Expression::typed_column("v", DataType::Int64),
        ])
        .unwrap()
        .resolve(None)
        .unwrap()
    }

    fn sample_partition(schema: &ExpressionList) -> VPartition {
        let mut data = HashMap::new();
        data.insert(
            "g".to_string(),
            vec![Value::from("a"), Value::from("b"), Value::from("a"), Value::Null],
        );
        data.insert(
            "v".to_string(),
            vec![Value::Int64(3), Value::Int64(1), Value::Int64(2), Value::Int64(5)],
        );
        VPartition::from_pydict(&data, schema, 0).unwrap()
    }

    fn column(part: &VPartition, schema: &ExpressionList, name: &str) -> Vec<Value> {
        let id = schema.get_expression_by_name(name).unwrap().id().unwrap();
        part.get_tile(id).unwrap().block.to_values().unwrap()
    }

    fn project(schema: &ExpressionList, exprs: Vec<Expression>) -> ExpressionList {
        ExpressionList::new(exprs).unwrap().resolve(Some(schema)).unwrap()
    }

    #[test]
    fn test_try_new_checks_invariants() {
        let id = ColumnId::from_raw(1);
        let block = DataBlock::from_values(vec![Value::Int64(1)], &DataType::Int64).unwrap();

        let mut wrong_key = BTreeMap::new();
        wrong_key.insert(ColumnId::from_raw(2), PyListTile::new(id, "a", 0, block.clone()));
        assert!(matches!(
            VPartition::try_new(wrong_key, 0),
            Err(TesselError::StructuralInvariant(_))
        ));

        let mut wrong_pid = BTreeMap::new();
        wrong_pid.insert(id, PyListTile::new(id, "a", 1, block));
        assert!(matches!(
            VPartition::try_new(wrong_pid, 0),
            Err(TesselError::StructuralInvariant(_))
        ));
    }

    #[test]
    fn test_zero_column_partition() {
        let part = VPartition::empty(3);
        assert_eq!(part.len(), 0);
        assert!(part.num_rows().is_err());
        let batch = part.to_record_batch(None).unwrap();
        assert_eq!(batch.num_columns(), 0);
    }

    #[test]
    fn test_zero_column_partition_refuses_row_operations() {
        let part = VPartition::empty(0);
        let is_structural =
            |r: TesselResult<_>| matches!(r, Err(TesselError::StructuralInvariant(_)));

        assert!(is_structural(part.sample(3, Some(1)).map(|_| ())));
        assert!(is_structural(part.take(&[]).map(|_| ())));
        assert!(is_structural(part.split_by_index(2, &[]).map(|_| ())));

        let computed = ExpressionList::new(vec![lit(1i64).alias("one")])
            .unwrap()
            .resolve(Some(&ExpressionList::empty()))
            .unwrap();
        assert!(is_structural(part.eval_expression_list(&computed).map(|_| ())));
        assert!(is_structural(part.filter(&computed).map(|_| ())));
        assert!(is_structural(part.hash_targets(&computed, 2).map(|_| ())));
    }

    #[test]
    fn test_from_pydict_cardinality() {
        let schema = source_schema();
        let mut data = HashMap::new();
        data.insert("g".to_string(), vec![Value::from("a")]);
        assert!(VPartition::from_pydict(&data, &schema, 0).is_err());
    }

    #[test]
    fn test_from_pydict_keeps_objects_generic() {
        let schema = ExpressionList::new(vec![Expression::typed_column("o", DataType::Object)])
            .unwrap()
            .resolve(None)
            .unwrap();
        let mut data = HashMap::new();
        data.insert(
            "o".to_string(),
            vec![Value::List(vec![Value::Int64(1)]), Value::Int64(2)],
        );
        let part = VPartition::from_pydict(&data, &schema, 0).unwrap();
        let id = schema.exprs()[0].id().unwrap();
        assert!(!part.get_tile(id).unwrap().block.is_arrow());
        assert_eq!(part.len(), 2);
    }

    #[test]
    fn test_eval_expression_passthrough_and_compute() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let exprs = project(
            &schema,
            vec![col("v").alias("w"), col("v").mul_expr(lit(2i64)).alias("double")],
        );
        let out = part.eval_expression_list(&exprs).unwrap();
        assert_eq!(out.num_columns(), 2);

        let w = out.get_tile(exprs.exprs()[0].id().unwrap()).unwrap();
        assert_eq!(w.column_name, "w");
        assert_eq!(w.block.to_values().unwrap()[0], Value::Int64(3));

        let doubled = out.get_tile(exprs.exprs()[1].id().unwrap()).unwrap();
        assert_eq!(
            doubled.block.to_values().unwrap(),
            vec![Value::Int64(6), Value::Int64(2), Value::Int64(4), Value::Int64(10)]
        );
    }

    #[test]
    fn test_filter_ands_predicates() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let preds = project(
            &schema,
            vec![
                col("v").gt(lit(1i64)).alias("p1"),
                col("g").eq(lit("a")).alias("p2"),
            ],
        );
        let out = part.filter(&preds).unwrap();
        assert_eq!(column(&out, &schema, "v"), vec![Value::Int64(3), Value::Int64(2)]);
        assert!(part.filter(&ExpressionList::empty()).is_err());
    }

    #[test]
    fn test_sort_and_head() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let key = &schema.get_expression_by_name("v").unwrap().clone();
        let asc = part.sort(key, false).unwrap();
        assert_eq!(
            column(&asc, &schema, "v"),
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3), Value::Int64(5)]
        );
        let top = part.sort(key, true).unwrap().head(2).unwrap();
        assert_eq!(column(&top, &schema, "v"), vec![Value::Int64(5), Value::Int64(3)]);
    }

    #[test]
    fn test_sample_is_reproducible() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let a = part.sample(10, Some(42)).unwrap();
        let b = part.sample(10, Some(42)).unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(column(&a, &schema, "v"), column(&b, &schema, "v"));
        assert_eq!(part.head(0).unwrap().sample(3, None).unwrap().len(), 0);
    }

    #[test]
    fn test_ungrouped_agg() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let v = schema.get_expression_by_name("v").unwrap().clone();
        let out = part.agg(&[(v, AggOp::Max)], None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(column(&out, &schema, "v"), vec![Value::Int64(5)]);
    }

    #[test]
    fn test_split_by_hash_is_deterministic() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let keys = project(&schema, vec![col("g")]);
        let first = part.hash_targets(&keys, 4).unwrap();
        let second = part.hash_targets(&keys, 4).unwrap();
        assert_eq!(first, second);
        // equal keys share a bucket
        assert_eq!(first[0], first[2]);

        let pieces = part.split_by_hash(&keys, 4).unwrap();
        assert_eq!(pieces.len(), 4);
        assert_eq!(pieces.iter().map(VPartition::len).sum::<usize>(), part.len());
        for (i, p) in pieces.iter().enumerate() {
            assert_eq!(p.partition_id(), i);
        }
        assert!(part.split_by_hash(&keys, 0).is_err());
    }

    #[test]
    fn test_merge_partitions_rejects_pid_mismatch() {
        let schema = source_schema();
        let pieces = sample_partition(&schema).split_by_index(2, &[0, 1, 0, 1]).unwrap();
        assert!(matches!(
            VPartition::merge_partitions(pieces.clone(), true),
            Err(TesselError::StructuralInvariant(_))
        ));
        let merged = VPartition::merge_partitions(pieces, false).unwrap();
        assert_eq!(merged.partition_id(), 0);
        assert_eq!(
            column(&merged, &schema, "v"),
            vec![Value::Int64(3), Value::Int64(2), Value::Int64(1), Value::Int64(5)]
        );
    }

    #[test]
    fn test_join_rejects_non_inner() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let keys = project(&schema, vec![col("g")]);
        let err = part
            .join(&part, &keys, &keys, &schema, JoinType::Left)
            .unwrap_err();
        assert!(matches!(err, TesselError::UnsupportedJoin(_)));
        assert_eq!("OUTER".parse::<JoinType>().unwrap(), JoinType::Outer);
        assert!("cross".parse::<JoinType>().is_err());
    }

    #[test]
    fn test_to_record_batch_with_schema() {
        let schema = source_schema();
        let part = sample_partition(&schema);
        let order = schema.keep(&["v", "g"]).unwrap();
        let batch = part.to_record_batch(Some(&order)).unwrap();
        assert_eq!(batch.num_rows(), 4);
        assert_eq!(batch.schema().field(0).name(), "v");
        assert_eq!(batch.schema().field(1).name(), "g");
    }
}
