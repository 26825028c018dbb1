//! Identities for columns, partitions and plan nodes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Index of a partition within one logical dataset.
pub type PartId = usize;

/// Identifier of a logical plan node.
pub type NodeId = u64;

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a resolved expression.
///
/// Column ids are the only key used to address a column inside a partition.
/// Names are display labels and may collide until resolution; ids never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(u64);

impl ColumnId {
    /// Allocate a fresh, process-unique column id.
    pub fn next() -> Self {
        Self(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id, e.g. one received from an external planner.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ids_are_unique_and_increasing() {
        let a = ColumnId::next();
        let b = ColumnId::next();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_display() {
        assert_eq!(ColumnId::from_raw(7).to_string(), "#7");
    }
}
