//! One column of one partition.

use common_error::{TesselError, TesselResult};
use tessel_core::{ColumnId, PartId};

use crate::block::DataBlock;

/// A column's materialized data inside a partition.
///
/// A tile is owned by exactly one [`VPartition`](crate::VPartition); tiles
/// only travel between partitions while a shuffle is merging them.
#[derive(Debug, Clone)]
pub struct PyListTile {
    /// Identity of the column.
    pub column_id: ColumnId,
    /// Display name of the column.
    pub column_name: String,
    /// Index of the partition holding this tile.
    pub partition_id: PartId,
    /// The values.
    pub block: DataBlock,
}

impl PyListTile {
    /// Create a new tile.
    pub fn new(
        column_id: ColumnId,
        column_name: impl Into<String>,
        partition_id: PartId,
        block: DataBlock,
    ) -> Self {
        Self {
            column_id,
            column_name: column_name.into(),
            partition_id,
            block,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.block.len()
    }

    /// Whether the tile has no rows.
    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    /// Same column and partition, different values.
    #[must_use]
    pub fn replace_block(&self, block: DataBlock) -> Self {
        Self {
            column_id: self.column_id,
            column_name: self.column_name.clone(),
            partition_id: self.partition_id,
            block,
        }
    }

    /// Transform the block, keeping column and partition tags.
    pub fn apply<F>(&self, f: F) -> TesselResult<Self>
    where
        F: FnOnce(&DataBlock) -> TesselResult<DataBlock>,
    {
        Ok(self.replace_block(f(&self.block)?))
    }

    /// Split rows into `n` tiles: row `i` goes to tile `targets[i]`.
    ///
    /// Output tile `j` is tagged with partition id `j`.
    pub fn split_by_index(&self, n: usize, targets: &[usize]) -> TesselResult<Vec<Self>> {
        if targets.len() != self.len() {
            return Err(TesselError::value_error(format!(
                "{} split targets for tile '{}' of length {}",
                targets.len(),
                self.column_name,
                self.len()
            )));
        }
        let blocks = self.block.partition_split(n, targets)?;
        if blocks.len() != n {
            return Err(TesselError::internal(format!(
                "partition split returned {} blocks, expected {n}",
                blocks.len()
            )));
        }
        Ok(blocks
            .into_iter()
            .enumerate()
            .map(|(pid, block)| Self {
                column_id: self.column_id,
                column_name: self.column_name.clone(),
                partition_id: pid,
                block,
            })
            .collect())
    }

    /// Concatenate tiles of the same column, in input order.
    ///
    /// A single tile is returned as is. With `verify_partition_id`, every tile
    /// must also carry the same partition id.
    pub fn merge_tiles(tiles: Vec<Self>, verify_partition_id: bool) -> TesselResult<Self> {
        let mut iter = tiles.into_iter();
        let Some(first) = iter.next() else {
            return Err(TesselError::value_error("need at least 1 tile to merge"));
        };
        let rest: Vec<Self> = iter.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        for tile in &rest {
            if tile.column_id != first.column_id {
                return Err(TesselError::structural(format!(
                    "mismatch of column id: {} vs {}",
                    first.column_id, tile.column_id
                )));
            }
            if tile.column_name != first.column_name {
                return Err(TesselError::structural(format!(
                    "mismatch of column name: '{}' vs '{}'",
                    first.column_name, tile.column_name
                )));
            }
            if verify_partition_id && tile.partition_id != first.partition_id {
                return Err(TesselError::structural(format!(
                    "mismatch of partition id: {} vs {}",
                    first.partition_id, tile.partition_id
                )));
            }
        }

        let blocks: Vec<DataBlock> = std::iter::once(&first)
            .chain(&rest)
            .map(|t| t.block.clone())
            .collect();
        Ok(first.replace_block(DataBlock::merge(&blocks)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::{DataType, Value};

    fn tile(id: u64, pid: PartId, values: &[i64]) -> PyListTile {
        PyListTile::new(
            ColumnId::from_raw(id),
            "x",
            pid,
            DataBlock::from_values(values.iter().map(|v| Value::Int64(*v)).collect(), &DataType::Int64)
                .unwrap(),
        )
    }

    fn ints(tile: &PyListTile) -> Vec<Value> {
        tile.block.to_values().unwrap()
    }

    #[test]
    fn test_split_by_index_retags_partitions() {
        let t = tile(1, 7, &[10, 11, 12, 13]);
        let parts = t.split_by_index(3, &[2, 0, 2, 1]).unwrap();
        assert_eq!(parts.len(), 3);
        for (i, p) in parts.iter().enumerate() {
            assert_eq!(p.partition_id, i);
            assert_eq!(p.column_id, t.column_id);
        }
        assert_eq!(ints(&parts[0]), vec![Value::Int64(11)]);
        assert_eq!(ints(&parts[1]), vec![Value::Int64(13)]);
        assert_eq!(ints(&parts[2]), vec![Value::Int64(10), Value::Int64(12)]);
    }

    #[test]
    fn test_split_requires_matching_targets() {
        let t = tile(1, 0, &[1, 2]);
        assert!(t.split_by_index(2, &[0]).is_err());
        assert!(t.split_by_index(2, &[0, 5]).is_err());
    }

    #[test]
    fn test_merge_tiles() {
        let merged =
            PyListTile::merge_tiles(vec![tile(1, 0, &[1, 2]), tile(1, 0, &[3])], true).unwrap();
        assert_eq!(
            ints(&merged),
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]
        );

        let single = PyListTile::merge_tiles(vec![tile(1, 4, &[9])], true).unwrap();
        assert_eq!(single.partition_id, 4);
    }

    #[test]
    fn test_merge_tiles_rejects_mismatches() {
        assert!(PyListTile::merge_tiles(vec![], true).is_err());
        assert!(matches!(
            PyListTile::merge_tiles(vec![tile(1, 0, &[1]), tile(2, 0, &[2])], false),
            Err(TesselError::StructuralInvariant(_))
        ));
        assert!(matches!(
            PyListTile::merge_tiles(vec![tile(1, 0, &[1]), tile(1, 1, &[2])], true),
            Err(TesselError::StructuralInvariant(_))
        ));
        assert!(PyListTile::merge_tiles(vec![tile(1, 0, &[1]), tile(1, 1, &[2])], false).is_ok());
    }

    #[test]
    fn test_apply_keeps_tags() {
        let t = tile(3, 2, &[1, 2, 3]);
        let head = t.apply(|b| Ok(b.head(1))).unwrap();
        assert_eq!(head.column_id, t.column_id);
        assert_eq!(head.partition_id, 2);
        assert_eq!(head.len(), 1);
    }
}
