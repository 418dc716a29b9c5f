pub mod batch;
pub mod connection;
pub mod daily_price;
pub mod schema;
pub mod sync_point;

pub use batch::{RecordBatch, Value};
pub use connection::ConnectionConfig;
pub use daily_price::DailyPrice;
pub use schema::{validate_identifier, ColumnSpec, TableSchema};
pub use sync_point::SyncPoint;
