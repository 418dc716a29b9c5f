use crate::errors::StoreError;
use crate::value_objects::{RecordBatch, SyncPoint, TableSchema};

/// Port over the OHLC table: read the sync watermark, append new rows.
pub trait OhlcStore {
    /// Timestamp of the newest row in `table`, ordered by `date_column`.
    /// An empty or unreadable table yields the sentinel watermark.
    fn last_synced_at(
        &mut self,
        table: &str,
        date_column: &str,
    ) -> Result<SyncPoint, StoreError>;

    /// Appends every row of the batch, returning how many were written.
    /// Rows written before a failure stay written.
    fn insert_batch(
        &mut self,
        table: &str,
        schema: &TableSchema,
        batch: &RecordBatch,
    ) -> Result<u64, StoreError>;
}
