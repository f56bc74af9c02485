use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

use serde::Serialize;

use super::{Amount, Direction};

/// One executed trade after ingestion. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub account_id: String,
    pub size_usd: Amount,
    pub closed_pnl: Amount,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Calendar date of `timestamp` in the run's reference time zone.
    pub date: NaiveDate,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.closed_pnl.cmp_zero() == Ordering::Greater
    }
}
