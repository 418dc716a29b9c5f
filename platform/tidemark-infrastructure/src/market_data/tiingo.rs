use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tidemark_domain::errors::FeedError;
use tidemark_domain::repositories::PriceFeed;
use tidemark_domain::value_objects::DailyPrice;

pub const DEFAULT_BASE_URL: &str = "https://api.tiingo.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// End-of-day prices from the Tiingo REST API.
pub struct TiingoClient {
    base_url: String,
    token: String,
    client: Client,
}

impl TiingoClient {
    pub fn new(token: String) -> Result<Self, FeedError> {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), token)
    }

    pub fn with_base_url(base_url: String, token: String) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| FeedError::Transport {
                cause: format!("failed to build http client: {err}"),
            })?;
        Ok(Self {
            base_url,
            token,
            client,
        })
    }
}

impl PriceFeed for TiingoClient {
    fn daily_ohlc(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, FeedError> {
        let endpoint = format!(
            "{}/tiingo/daily/{}/prices",
            self.base_url.trim_end_matches('/'),
            ticker
        );
        let span = tracing::info_span!(
            "infra.tiingo.daily_ohlc",
            endpoint = %endpoint,
            ticker = %ticker
        );
        let _enter = span.enter();

        metrics::counter!("tidemark.infra.tiingo.requests_total", "endpoint" => "daily_prices")
            .increment(1);
        let started = Instant::now();
        let response = self
            .client
            .get(&endpoint)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .query(&[
                ("startDate", start.format("%Y-%m-%d").to_string()),
                ("endDate", end.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .map_err(|err| FeedError::Transport {
                cause: err.to_string(),
            })?;

        let status = response.status();
        metrics::histogram!(
            "tidemark.infra.tiingo.request_ms",
            "endpoint" => "daily_prices",
            "status" => status.as_u16().to_string()
        )
        .record(started.elapsed().as_millis() as f64);
        if !status.is_success() {
            metrics::counter!("tidemark.infra.tiingo.errors_total", "stage" => "status")
                .increment(1);
            tracing::warn!(status = status.as_u16(), ticker = %ticker, "feed refused request");
            return Err(FeedError::Status {
                code: status.as_u16(),
            });
        }

        let wire: Vec<TiingoDailyPrice> = response.json().map_err(|err| {
            metrics::counter!("tidemark.infra.tiingo.errors_total", "stage" => "decode")
                .increment(1);
            FeedError::Decode {
                cause: err.to_string(),
            }
        })?;

        let mut prices = Vec::with_capacity(wire.len());
        for row in wire {
            prices.push(row.into_domain()?);
        }
        prices.sort_by_key(|price| price.date);
        tracing::debug!(ticker = %ticker, rows = prices.len(), "fetched daily bars");
        Ok(prices)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TiingoDailyPrice {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
    adj_open: f64,
    adj_high: f64,
    adj_low: f64,
    adj_close: f64,
    adj_volume: i64,
    div_cash: f64,
    split_factor: f64,
}

impl TiingoDailyPrice {
    fn into_domain(self) -> Result<DailyPrice, FeedError> {
        let date = parse_feed_date(&self.date).ok_or_else(|| FeedError::Decode {
            cause: format!("unparseable bar date: {:?}", self.date),
        })?;
        Ok(DailyPrice {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            adj_open: self.adj_open,
            adj_high: self.adj_high,
            adj_low: self.adj_low,
            adj_close: self.adj_close,
            adj_volume: self.adj_volume,
            div_cash: self.div_cash,
            split_factor: self.split_factor,
        })
    }
}

fn parse_feed_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    const SAMPLE_BAR: &str = r#"{
        "date": "2024-05-03T00:00:00.000Z",
        "open": 186.65,
        "high": 187.0,
        "low": 182.66,
        "close": 183.38,
        "volume": 163224109,
        "adjOpen": 186.65,
        "adjHigh": 187.0,
        "adjLow": 182.66,
        "adjClose": 183.38,
        "adjVolume": 163224109,
        "divCash": 0.0,
        "splitFactor": 1.0
    }"#;

    #[test]
    fn wire_format_uses_camel_case_names() {
        let bar: TiingoDailyPrice = serde_json::from_str(SAMPLE_BAR).expect("decode bar");
        assert_eq!(bar.adj_close, 183.38);
        assert_eq!(bar.adj_volume, 163224109);
        assert_eq!(bar.split_factor, 1.0);
    }

    #[test]
    fn into_domain_parses_rfc3339_dates() {
        let bar: TiingoDailyPrice = serde_json::from_str(SAMPLE_BAR).expect("decode bar");
        let price = bar.into_domain().expect("domain bar");
        assert_eq!(price.date, Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap());
        assert_eq!(price.close, 183.38);
    }

    #[test]
    fn bare_dates_are_promoted_to_midnight_utc() {
        let date = parse_feed_date("2024-05-03").expect("parse");
        assert_eq!(date.hour(), 0);
        assert_eq!(date.date_naive().to_string(), "2024-05-03");
    }

    #[test]
    fn unparseable_dates_become_decode_errors() {
        let mut bar: TiingoDailyPrice = serde_json::from_str(SAMPLE_BAR).expect("decode bar");
        bar.date = "yesterday".to_string();
        let err = bar.into_domain().expect_err("bad date");
        assert!(matches!(err, FeedError::Decode { .. }));
    }
}
