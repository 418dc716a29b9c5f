use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Watermark for incremental sync: the timestamp of the newest row we
/// already hold, compared and rendered in naive wall-clock form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncPoint(NaiveDateTime);

impl SyncPoint {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Starting point used when the table has no rows yet: everything
    /// from 2018-01-01 onward is considered missing.
    pub fn sentinel() -> Self {
        let date = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN);
        Self(date.and_time(NaiveTime::MIN))
    }

    pub fn from_utc(at: DateTime<Utc>) -> Self {
        Self(at.naive_utc())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }

    /// Parses timestamp text as the database may render it. Any zone
    /// offset from `+` onward is dropped rather than converted.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let bare = trimmed
            .split_once('+')
            .map(|(head, _)| head)
            .unwrap_or(trimmed)
            .trim_end();
        NaiveDateTime::parse_from_str(bare, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(bare, "%Y-%m-%dT%H:%M:%S%.f"))
            .map(Self)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(bare, "%Y-%m-%d")
                    .ok()
                    .map(Self::from_date)
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }
}

impl Default for SyncPoint {
    fn default() -> Self {
        Self::sentinel()
    }
}

impl fmt::Display for SyncPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DISPLAY_FORMAT))
    }
}
