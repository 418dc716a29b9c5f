pub mod postgres_store;
pub mod sql;

pub use postgres_store::PostgresOhlcStore;
