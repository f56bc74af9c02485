use csv::StringRecord;

use crate::errors::{PipelineError, Result};

/// Required trade-log columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeColumn {
    AccountId,
    SizeUsd,
    ClosedPnl,
    Timestamp,
    Direction,
}

impl TradeColumn {
    pub const ALL: [TradeColumn; 5] = [
        TradeColumn::AccountId,
        TradeColumn::SizeUsd,
        TradeColumn::ClosedPnl,
        TradeColumn::Timestamp,
        TradeColumn::Direction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeColumn::AccountId => "account_id",
            TradeColumn::SizeUsd => "size_usd",
            TradeColumn::ClosedPnl => "closed_pnl",
            TradeColumn::Timestamp => "timestamp",
            TradeColumn::Direction => "direction",
        }
    }

    /// Accepted normalized header names, most preferred first.
    ///
    /// Exchange exports carry both `Timestamp IST` (wall clock) and a raw
    /// `Timestamp` column; the wall-clock one wins when both are present.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            TradeColumn::AccountId => &["account_id", "account"],
            TradeColumn::SizeUsd => &["size_usd"],
            TradeColumn::ClosedPnl => &["closed_pnl"],
            TradeColumn::Timestamp => &["timestamp_ist", "timestamp"],
            TradeColumn::Direction => &["direction"],
        }
    }
}

/// Header positions of the required columns in one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub account_id: usize,
    pub size_usd: usize,
    pub closed_pnl: usize,
    pub timestamp: usize,
    pub direction: usize,
}

impl ColumnIndex {
    /// Resolve required columns from a header row. Every missing column is
    /// reported at once.
    pub fn resolve(headers: &StringRecord) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();

        let find = |column: TradeColumn| {
            column
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };

        let mut missing = Vec::new();
        let mut positions = [0usize; 5];
        for (slot, column) in positions.iter_mut().zip(TradeColumn::ALL) {
            match find(column) {
                Some(idx) => *slot = idx,
                None => missing.push(column.as_str()),
            }
        }

        if !missing.is_empty() {
            let found: Vec<&str> = headers.iter().collect();
            return Err(PipelineError::ingest(format!(
                "missing required column(s): {} (found: [{}])",
                missing.join(", "),
                found.join(", ")
            )));
        }

        let [account_id, size_usd, closed_pnl, timestamp, direction] = positions;
        Ok(Self {
            account_id,
            size_usd,
            closed_pnl,
            timestamp,
            direction,
        })
    }
}

/// `" Closed PnL "` -> `"closed_pnl"`.
fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_headers() {
        let headers =
            StringRecord::from(vec!["account_id", "size_usd", "closed_pnl", "timestamp", "direction"]);
        let idx = ColumnIndex::resolve(&headers).unwrap();
        assert_eq!(idx.account_id, 0);
        assert_eq!(idx.direction, 4);
    }

    #[test]
    fn test_export_headers_with_extra_columns() {
        let headers = StringRecord::from(vec![
            "Account",
            "Coin",
            "Execution Price",
            "Size USD",
            "Side",
            "Timestamp IST",
            "Direction",
            "Closed PnL",
            "Timestamp",
        ]);
        let idx = ColumnIndex::resolve(&headers).unwrap();
        assert_eq!(idx.account_id, 0);
        assert_eq!(idx.size_usd, 3);
        assert_eq!(idx.timestamp, 5, "wall-clock column preferred");
        assert_eq!(idx.direction, 6);
        assert_eq!(idx.closed_pnl, 7);
    }

    #[test]
    fn test_missing_columns_all_listed() {
        let headers = StringRecord::from(vec!["account_id", "timestamp"]);
        let err = ColumnIndex::resolve(&headers).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, PipelineError::Ingest(_)));
        assert!(msg.contains("size_usd"));
        assert!(msg.contains("closed_pnl"));
        assert!(msg.contains("direction"));
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Closed PnL "), "closed_pnl");
        assert_eq!(normalize_header("\u{feff}Account"), "account");
        assert_eq!(normalize_header("size-usd"), "size_usd");
    }
}
