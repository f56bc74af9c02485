//! Mixed-format timestamp parsing.
//!
//! Trade exports are inconsistent: the same file can hold `02-12-2024 22:50`,
//! `2024-12-02 22:50:13.120` and epoch milliseconds. Every accepted form is
//! resolved to one UTC instant; values without an offset are read as wall-clock
//! time in the run's reference zone.
//!
//! DST handling for naive values: ambiguous (fall-back) times take the earlier
//! instant, nonexistent (spring-forward) times are nudged forward minute by
//! minute until they resolve.

use anyhow::anyhow;
use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::DateOrder;

/// Epoch values at or above this are milliseconds (1e11 s is year 5138).
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
];

const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%m-%d-%Y %H:%M:%S%.f",
    "%m-%d-%Y %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m.%d.%Y %H:%M:%S%.f",
    "%m.%d.%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y"];
const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%m-%d-%Y", "%m/%d/%Y", "%m.%d.%Y"];

/// Parses timestamps for one run. Holds the reference zone so that every
/// record derives its calendar date the same way.
#[derive(Debug, Clone, Copy)]
pub struct TimestampParser {
    tz: Tz,
    order: DateOrder,
}

impl TimestampParser {
    pub fn new(tz: Tz, order: DateOrder) -> Self {
        Self { tz, order }
    }

    pub fn parse(&self, raw: &str) -> anyhow::Result<DateTime<Utc>> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(anyhow!("empty timestamp"));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(dt.with_timezone(&Utc));
            }
        }

        if let Some(dt) = parse_epoch(s) {
            return Ok(dt);
        }

        let (datetime_formats, date_formats) = match self.order {
            DateOrder::DayFirst => (DAY_FIRST_DATETIME_FORMATS, DAY_FIRST_DATE_FORMATS),
            DateOrder::MonthFirst => (MONTH_FIRST_DATETIME_FORMATS, MONTH_FIRST_DATE_FORMATS),
        };

        for fmt in ISO_DATETIME_FORMATS.iter().chain(datetime_formats) {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return self.from_local(naive);
            }
        }
        for fmt in ISO_DATE_FORMATS.iter().chain(date_formats) {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return self.from_local(date.and_time(chrono::NaiveTime::MIN));
            }
        }

        Err(anyhow!("unrecognised timestamp format: '{s}'"))
    }

    /// Calendar date of `ts` in the reference zone.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }

    fn from_local(&self, naive: NaiveDateTime) -> anyhow::Result<DateTime<Utc>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                let mut t = naive;
                for _ in 0..120 {
                    t += Duration::minutes(1);
                    if let LocalResult::Single(dt) = self.tz.from_local_datetime(&t) {
                        return Ok(dt.with_timezone(&Utc));
                    }
                }
                Err(anyhow!("nonexistent local time {naive} in {}", self.tz.name()))
            }
        }
    }
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let looks_numeric = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+'));
    if !looks_numeric || !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = s.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let millis = if value >= EPOCH_MILLIS_THRESHOLD {
        value.round() as i64
    } else {
        (value * 1000.0).round() as i64
    };
    DateTime::from_timestamp_millis(millis)
}
