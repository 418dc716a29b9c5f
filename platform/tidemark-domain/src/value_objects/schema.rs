use serde::{Deserialize, Serialize};

use crate::errors::SchemaError;

/// Accepts the identifiers we are willing to splice into SQL text:
/// ASCII letters, digits and underscores, not starting with a digit.
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let bad = || SchemaError::BadIdentifier {
        name: name.to_string(),
    };
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return Err(bad()),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(bad());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
}

/// Ordered column list for the target table. Construction validates the
/// shape once so SQL builders can trust every name in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        for (i, col) in columns.iter().enumerate() {
            validate_identifier(&col.name)?;
            if columns[..i].iter().any(|prior| prior.name == col.name) {
                return Err(SchemaError::DuplicateColumn {
                    name: col.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col.name == name)
    }
}
