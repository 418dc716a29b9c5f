use chrono::NaiveDate;
use thiserror::Error;
use tidemark_domain::errors::{FeedError, SchemaError, StoreError};
use tidemark_domain::repositories::{OhlcStore, PriceFeed};
use tidemark_domain::services::reshape;
use tidemark_domain::value_objects::{SyncPoint, TableSchema};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch window starts after it ends: {start} > {end}")]
    Window { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Watermark read before fetching.
    pub watermark: SyncPoint,
    pub fetched: usize,
    pub inserted: u64,
}

/// One incremental cycle: read the watermark, fetch the window from the
/// watermark day through `end`, insert the new rows. A sentinel watermark
/// means the table is empty, so every fetched bar is kept; otherwise only
/// rows strictly newer than the watermark are inserted, and re-running
/// against an unchanged feed inserts nothing.
pub fn sync_once(
    store: &mut dyn OhlcStore,
    feed: &dyn PriceFeed,
    schema: &TableSchema,
    table: &str,
    date_column: &str,
    ticker: &str,
    end: NaiveDate,
) -> Result<SyncReport, SyncError> {
    let span = tracing::info_span!("app.sync_once", table = %table, ticker = %ticker);
    let _enter = span.enter();

    let watermark = store.last_synced_at(table, date_column)?;
    let start = watermark.date();
    if start > end {
        return Err(SyncError::Window { start, end });
    }
    tracing::info!(watermark = %watermark, start = %start, end = %end, "fetching window");

    let prices = feed.daily_ohlc(ticker, start, end)?;
    let fetched = prices.len();

    // The sentinel marks a fresh table, not a stored row, so a first
    // backfill keeps every fetched bar.
    let newer_than = if watermark == SyncPoint::sentinel() {
        None
    } else {
        Some(&watermark)
    };
    let batch = reshape::batch_from_prices(&prices, schema, ticker, newer_than)?;
    let inserted = store.insert_batch(table, schema, &batch)?;

    tracing::info!(fetched, inserted, table = %table, "sync cycle complete");
    Ok(SyncReport {
        watermark,
        fetched,
        inserted,
    })
}
