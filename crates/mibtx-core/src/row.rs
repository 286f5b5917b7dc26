//! Conceptual table rows

use crate::oid::Oid;
use crate::value::Value;
use std::collections::BTreeMap;

/// One row of a conceptual table
///
/// Cells are keyed by column sub-identifier and iterate in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    index: Oid,
    cells: BTreeMap<u32, Value>,
}

impl TableRow {
    /// Create empty row with the given index
    #[inline]
    #[must_use]
    pub fn new(index: Oid) -> Self {
        Self {
            index,
            cells: BTreeMap::new(),
        }
    }

    /// Builder-style cell setter
    #[inline]
    #[must_use]
    pub fn with_cell(mut self, column: u32, value: impl Into<Value>) -> Self {
        self.cells.insert(column, value.into());
        self
    }

    /// Row index
    #[inline]
    #[must_use]
    pub fn index(&self) -> &Oid {
        &self.index
    }

    /// Cell value at `column`
    #[inline]
    #[must_use]
    pub fn get(&self, column: u32) -> Option<&Value> {
        self.cells.get(&column)
    }

    /// Replace cell value, returning the previous one
    pub fn set(&mut self, column: u32, value: Value) -> Option<Value> {
        self.cells.insert(column, value)
    }

    /// Instance OID of a cell: `entry.column.index`
    #[must_use]
    pub fn cell_oid(&self, entry: &Oid, column: u32) -> Oid {
        entry.child(column).append(&self.index)
    }

    /// Cells in column order
    pub fn cells(&self) -> impl Iterator<Item = (u32, &Value)> {
        self.cells.iter().map(|(c, v)| (*c, v))
    }

    /// Number of populated cells
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cells are populated
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
