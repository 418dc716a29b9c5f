use chrono::{DateTime, Utc};

use crate::errors::SchemaError;
use crate::value_objects::schema::{validate_identifier, TableSchema};

/// A single cell bound for a parameterized insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Float(f64),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

/// Rows keyed by an explicit column list, decoupled from the physical
/// column order of the target table.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        for (i, name) in columns.iter().enumerate() {
            validate_identifier(name)?;
            if columns[..i].contains(name) {
                return Err(SchemaError::DuplicateColumn { name: name.clone() });
            }
        }
        for row in &rows {
            if row.len() != columns.len() {
                return Err(SchemaError::RowWidth {
                    expected: columns.len(),
                    got: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Every batch column must name a declared table column.
    pub fn check_against(&self, schema: &TableSchema) -> Result<(), SchemaError> {
        for name in &self.columns {
            if !schema.contains(name) {
                return Err(SchemaError::UnknownColumn { name: name.clone() });
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
