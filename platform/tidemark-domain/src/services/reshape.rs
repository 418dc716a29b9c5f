use crate::errors::SchemaError;
use crate::value_objects::{DailyPrice, RecordBatch, SyncPoint, TableSchema, Value};

/// Column names the feed can populate. Anything else declared in the
/// table schema is left for the database to default.
pub const FEED_COLUMNS: [&str; 14] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "adj_open",
    "adj_high",
    "adj_low",
    "adj_close",
    "adj_volume",
    "div_cash",
    "split_factor",
    "ticker",
];

/// Reshapes fetched daily bars into an insertable batch.
///
/// Batch columns are the table columns the feed knows how to fill, in
/// table order. Rows at or before `newer_than` are dropped so a fetch
/// window that overlaps the watermark cannot re-insert held rows.
pub fn batch_from_prices(
    prices: &[DailyPrice],
    schema: &TableSchema,
    ticker: &str,
    newer_than: Option<&SyncPoint>,
) -> Result<RecordBatch, SchemaError> {
    let names: Vec<String> = schema
        .columns()
        .iter()
        .filter(|col| FEED_COLUMNS.contains(&col.name.as_str()))
        .map(|col| col.name.clone())
        .collect();
    if names.is_empty() {
        return Err(SchemaError::NoUsableColumns);
    }

    let mut rows = Vec::with_capacity(prices.len());
    for price in prices {
        if let Some(mark) = newer_than {
            if SyncPoint::from_utc(price.date) <= *mark {
                continue;
            }
        }
        let mut row = Vec::with_capacity(names.len());
        for name in &names {
            match cell_for(price, ticker, name) {
                Some(value) => row.push(value),
                None => return Err(SchemaError::UnknownColumn { name: name.clone() }),
            }
        }
        rows.push(row);
    }
    RecordBatch::new(names, rows)
}

fn cell_for(price: &DailyPrice, ticker: &str, column: &str) -> Option<Value> {
    let value = match column {
        "date" => Value::Timestamp(price.date),
        "open" => Value::Float(price.open),
        "high" => Value::Float(price.high),
        "low" => Value::Float(price.low),
        "close" => Value::Float(price.close),
        "volume" => Value::Int(price.volume),
        "adj_open" => Value::Float(price.adj_open),
        "adj_high" => Value::Float(price.adj_high),
        "adj_low" => Value::Float(price.adj_low),
        "adj_close" => Value::Float(price.adj_close),
        "adj_volume" => Value::Int(price.adj_volume),
        "div_cash" => Value::Float(price.div_cash),
        "split_factor" => Value::Float(price.split_factor),
        "ticker" => Value::Text(ticker.to_string()),
        _ => return None,
    };
    Some(value)
}
