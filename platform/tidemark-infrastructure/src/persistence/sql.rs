//! SQL text used by the store. Identifier arguments must be validated
//! by the caller before they reach these builders.

use tidemark_domain::value_objects::TableSchema;

/// Maintenance database used to bootstrap the target one.
pub const ADMIN_DATABASE: &str = "postgres";

pub const CHECK_DATABASE: &str = "SELECT 1 FROM pg_database WHERE datname = $1";

pub const CHECK_TABLE: &str =
    "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)";

/// CREATE DATABASE does not accept bind parameters, so the name is
/// spliced after validation.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE {database}")
}

pub fn create_table(table: &str, schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|col| format!("  {} {}", col.name, col.sql_type))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        table,
        columns.join(",\n")
    )
}

pub fn last_record(table: &str, date_column: &str) -> String {
    format!("SELECT * FROM {table} ORDER BY {date_column} DESC LIMIT 1")
}

pub fn insert_into(table: &str, columns: &[String]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    )
}
