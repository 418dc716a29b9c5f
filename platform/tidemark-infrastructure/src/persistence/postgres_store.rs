use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use tidemark_domain::errors::{SchemaError, StoreError};
use tidemark_domain::repositories::OhlcStore;
use tidemark_domain::value_objects::{
    validate_identifier, ConnectionConfig, RecordBatch, SyncPoint, TableSchema, Value,
};

use crate::persistence::sql;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Single-session PostgreSQL store. One client outlives the whole run;
/// statements are issued in autocommit, so rows written before a
/// failure stay written.
pub struct PostgresOhlcStore {
    client: Client,
    pub database: String,
}

// `postgres::Client` has no `Debug` impl, so derive is unavailable.
impl std::fmt::Debug for PostgresOhlcStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresOhlcStore")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl PostgresOhlcStore {
    /// Opens a session against the configured database, which must
    /// already exist.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, StoreError> {
        let client = open_client(config)?;
        Ok(Self {
            client,
            database: config.database.clone(),
        })
    }

    /// Brings the target database and table into existence if either is
    /// missing, then returns a store connected to the target database.
    /// Existing objects are never dropped or altered; a second call is
    /// a no-op.
    pub fn ensure_ready(
        config: &ConnectionConfig,
        table: &str,
        schema: &TableSchema,
    ) -> Result<Self, StoreError> {
        let span = tracing::info_span!(
            "infra.postgres.ensure_ready",
            database = %config.database,
            table = %table
        );
        let _enter = span.enter();

        validate_table_name(table)?;
        validate_identifier(&config.database)?;

        {
            let admin = config.with_database(sql::ADMIN_DATABASE);
            let mut admin_client = open_client(&admin)?;
            if database_exists(&mut admin_client, &config.database) {
                tracing::info!(database = %config.database, "database present");
            } else {
                let ddl = sql::create_database(&config.database);
                admin_client.batch_execute(&ddl).map_err(|err| StoreError::Query {
                    context: format!("create database {}", config.database),
                    cause: err.to_string(),
                })?;
                tracing::info!(database = %config.database, "created database");
            }
        }

        let mut store = Self::connect(config)?;
        if store.table_present(table) {
            tracing::info!(table = %table, "table present");
        } else {
            let ddl = sql::create_table(table, schema);
            store.client.batch_execute(&ddl).map_err(|err| StoreError::Query {
                context: format!("create table {table}"),
                cause: err.to_string(),
            })?;
            tracing::info!(table = %table, "created table");
        }
        Ok(store)
    }

    fn table_present(&mut self, table: &str) -> bool {
        // information_schema holds bare table names, without any
        // schema qualifier the operator may have configured.
        let bare = table.rsplit('.').next().unwrap_or(table);
        match self.client.query_one(sql::CHECK_TABLE, &[&bare]) {
            Ok(row) => row.try_get::<_, bool>(0).unwrap_or(false),
            Err(err) => {
                tracing::warn!(error = %err, table = %table, "table check failed, treating as absent");
                false
            }
        }
    }
}

impl OhlcStore for PostgresOhlcStore {
    fn last_synced_at(
        &mut self,
        table: &str,
        date_column: &str,
    ) -> Result<SyncPoint, StoreError> {
        let span = tracing::info_span!(
            "infra.postgres.last_synced_at",
            table = %table,
            column = %date_column
        );
        let _enter = span.enter();

        validate_table_name(table)?;
        validate_identifier(date_column)?;

        let query = sql::last_record(table, date_column);
        let rows = match self.client.query(&query, &[]) {
            Ok(rows) => rows,
            Err(err) => {
                metrics::counter!("tidemark.infra.postgres.watermark.fallbacks_total", "stage" => "query")
                    .increment(1);
                tracing::warn!(error = %err, table = %table, "no readable records, starting from sentinel");
                return Ok(SyncPoint::sentinel());
            }
        };
        let Some(row) = rows.first() else {
            tracing::info!(table = %table, "table empty, starting from sentinel");
            return Ok(SyncPoint::sentinel());
        };
        match watermark_cell(row, date_column) {
            Some(point) => {
                tracing::debug!(table = %table, watermark = %point, "read watermark");
                Ok(point)
            }
            None => {
                metrics::counter!("tidemark.infra.postgres.watermark.fallbacks_total", "stage" => "decode")
                    .increment(1);
                tracing::warn!(table = %table, column = %date_column, "unreadable watermark cell, starting from sentinel");
                Ok(SyncPoint::sentinel())
            }
        }
    }

    fn insert_batch(
        &mut self,
        table: &str,
        schema: &TableSchema,
        batch: &RecordBatch,
    ) -> Result<u64, StoreError> {
        let start = Instant::now();
        let span = tracing::info_span!(
            "infra.postgres.insert_batch",
            table = %table,
            rows = batch.len()
        );
        let _enter = span.enter();

        validate_table_name(table)?;
        batch.check_against(schema)?;
        if batch.is_empty() {
            tracing::info!(rows = 0u64, table = %table, "no records to insert");
            return Ok(0);
        }

        let query = sql::insert_into(table, batch.columns());
        let statement = self.client.prepare(&query).map_err(|err| StoreError::Query {
            context: format!("prepare insert into {table}"),
            cause: err.to_string(),
        })?;

        let mut written: u64 = 0;
        for row in batch.rows() {
            let params = bind_params(row);
            if let Err(err) = self.client.execute(&statement, &params) {
                metrics::counter!("tidemark.infra.postgres.insert.calls_total", "result" => "err")
                    .increment(1);
                tracing::error!(error = %err, table = %table, written, "insert failed mid-batch");
                return Err(StoreError::Insert {
                    table: table.to_string(),
                    rows: batch.len(),
                    cause: err.to_string(),
                });
            }
            written += 1;
        }

        metrics::counter!("tidemark.infra.postgres.insert.calls_total", "result" => "ok")
            .increment(1);
        metrics::counter!("tidemark.infra.postgres.insert.rows_total").increment(written);
        metrics::histogram!("tidemark.infra.postgres.insert_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(rows = written, table = %table, "inserted records");
        Ok(written)
    }
}

fn open_client(config: &ConnectionConfig) -> Result<Client, StoreError> {
    let mut pg = postgres::Config::new();
    pg.host(&config.host)
        .port(config.port)
        .user(&config.user)
        .password(&config.password)
        .dbname(&config.database)
        .application_name("tidemark")
        .connect_timeout(CONNECT_TIMEOUT);
    pg.connect(NoTls).map_err(|err| StoreError::Connect {
        database: config.database.clone(),
        cause: err.to_string(),
    })
}

fn database_exists(client: &mut Client, database: &str) -> bool {
    match client.query(sql::CHECK_DATABASE, &[&database]) {
        Ok(rows) => !rows.is_empty(),
        Err(err) => {
            tracing::warn!(error = %err, database = %database, "database check failed, treating as absent");
            false
        }
    }
}

/// Decodes the watermark cell by column name, whatever type the
/// operator declared for it.
fn watermark_cell(row: &Row, date_column: &str) -> Option<SyncPoint> {
    let idx = row
        .columns()
        .iter()
        .position(|col| col.name() == date_column)?;
    if let Ok(ts) = row.try_get::<_, DateTime<Utc>>(idx) {
        return Some(SyncPoint::from_utc(ts));
    }
    if let Ok(naive) = row.try_get::<_, NaiveDateTime>(idx) {
        return Some(SyncPoint::new(naive));
    }
    if let Ok(date) = row.try_get::<_, NaiveDate>(idx) {
        return Some(SyncPoint::from_date(date));
    }
    if let Ok(text) = row.try_get::<_, String>(idx) {
        return SyncPoint::parse_lenient(&text);
    }
    None
}

fn bind_params(row: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    row.iter()
        .map(|value| match value {
            Value::Text(text) => text as &(dyn ToSql + Sync),
            Value::Float(v) => v as &(dyn ToSql + Sync),
            Value::Int(v) => v as &(dyn ToSql + Sync),
            Value::Timestamp(ts) => ts as &(dyn ToSql + Sync),
        })
        .collect()
}

fn validate_table_name(table: &str) -> Result<(), SchemaError> {
    let parts: Vec<&str> = table.split('.').collect();
    if table.is_empty() || parts.len() > 2 {
        return Err(SchemaError::BadIdentifier {
            name: table.to_string(),
        });
    }
    for part in parts {
        validate_identifier(part).map_err(|_| SchemaError::BadIdentifier {
            name: table.to_string(),
        })?;
    }
    Ok(())
}
