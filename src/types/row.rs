use std::sync::Arc;

use super::value::{ColumnSpec, ColumnType, CqlValue};

/// Normalized, insertion-ordered row object handed back to the ORM.
pub type RowObject = serde_json::Map<String, serde_json::Value>;

/// Read access to one driver row, by position or by column name.
pub trait RowReader {
    fn column_count(&self) -> usize;

    fn column_name(&self, idx: usize) -> Option<&str>;

    /// Declared type of the column, when the driver reported one.
    fn declared_type(&self, idx: usize) -> Option<ColumnType>;

    fn value(&self, idx: usize) -> Option<&CqlValue>;

    /// Position of a column. Names compare case-insensitively, like unquoted
    /// CQL identifiers.
    fn index_of(&self, name: &str) -> Option<usize> {
        (0..self.column_count()).find(|&idx| {
            self.column_name(idx)
                .is_some_and(|column| column.eq_ignore_ascii_case(name))
        })
    }

    fn value_by_name(&self, name: &str) -> Option<&CqlValue> {
        self.index_of(name).and_then(|idx| self.value(idx))
    }
}

/// A row as returned by a driver: shared column metadata plus values.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    columns: Arc<[ColumnSpec]>,
    values: Vec<CqlValue>,
}

impl RawRow {
    pub fn new(columns: Arc<[ColumnSpec]>, values: Vec<CqlValue>) -> Self {
        Self { columns, values }
    }
}

impl RowReader for RawRow {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(|c| c.name.as_str())
    }

    fn declared_type(&self, idx: usize) -> Option<ColumnType> {
        self.columns.get(idx).and_then(|c| c.declared_type)
    }

    fn value(&self, idx: usize) -> Option<&CqlValue> {
        self.values.get(idx)
    }
}
