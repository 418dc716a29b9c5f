use thiserror::Error;

/// Violations of the declared table shape, caught before any SQL runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("table schema has no columns")]
    EmptySchema,

    #[error("duplicate column name: {name}")]
    DuplicateColumn { name: String },

    #[error("invalid SQL identifier: {name}")]
    BadIdentifier { name: String },

    #[error("column {name} is not declared in the table schema")]
    UnknownColumn { name: String },

    #[error("row has {got} values, expected {expected}")]
    RowWidth { expected: usize, got: usize },

    #[error("no batch columns match the table schema")]
    NoUsableColumns,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to database {database}: {cause}")]
    Connect { database: String, cause: String },

    #[error("query failed ({context}): {cause}")]
    Query { context: String, cause: String },

    #[error("failed to insert {rows} records into {table}: {cause}")]
    Insert {
        table: String,
        rows: usize,
        cause: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("price feed request failed: {cause}")]
    Transport { cause: String },

    #[error("price feed returned status {code}")]
    Status { code: u16 },

    #[error("failed to decode price feed response: {cause}")]
    Decode { cause: String },
}
