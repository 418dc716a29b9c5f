use chrono::NaiveDate;

use crate::errors::FeedError;
use crate::value_objects::DailyPrice;

/// Port over the upstream market-data vendor.
pub trait PriceFeed {
    /// Daily bars for `ticker` covering `start..=end`, oldest first.
    fn daily_ohlc(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, FeedError>;
}
