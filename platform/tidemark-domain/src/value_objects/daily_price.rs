use chrono::{DateTime, Utc};

/// One trading day for one ticker, raw and split/dividend adjusted.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPrice {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub adj_open: f64,
    pub adj_high: f64,
    pub adj_low: f64,
    pub adj_close: f64,
    pub adj_volume: i64,
    pub div_cash: f64,
    pub split_factor: f64,
}
