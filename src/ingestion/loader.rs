use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use metrics::counter;

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::ingestion::schema::ColumnIndex;
use crate::ingestion::timestamp::TimestampParser;
use crate::models::{Amount, Direction, TradeRecord};

/// Output of one load: the de-duplicated records plus row accounting.
#[derive(Debug, Clone)]
pub struct LoadedTrades {
    pub records: Vec<TradeRecord>,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
}

/// Reads a trade log, validates its schema and normalizes every row into a
/// `TradeRecord`. Any bad row aborts the load.
#[derive(Debug, Clone, Copy)]
pub struct DataLoader {
    parser: TimestampParser,
}

impl DataLoader {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            parser: TimestampParser::new(config.reference_tz, config.date_order),
        }
    }

    pub fn load_path(&self, path: &Path) -> Result<LoadedTrades> {
        if !path.exists() {
            return Err(PipelineError::ingest(format!(
                "trades file not found at {}",
                path.display()
            )));
        }
        let file = File::open(path).map_err(|e| {
            PipelineError::ingest(format!("cannot open {}: {e}", path.display()))
        })?;

        tracing::info!(path = %path.display(), "Loading trade log");
        self.load_reader(file)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> Result<LoadedTrades> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv
            .headers()
            .map_err(|e| PipelineError::ingest(format!("cannot read header row: {e}")))?
            .clone();
        let columns = ColumnIndex::resolve(&headers)?;

        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut records = Vec::new();
        let mut rows_read = 0usize;
        let mut duplicates_dropped = 0usize;

        for row in csv.records() {
            let row = row.map_err(|e| PipelineError::ingest(format!("malformed CSV: {e}")))?;
            rows_read += 1;

            if !seen.insert(dedup_key(&row)) {
                duplicates_dropped += 1;
                continue;
            }

            records.push(self.parse_row(&row, &columns)?);
        }

        counter!("trades_loaded_total").increment(records.len() as u64);
        counter!("duplicate_rows_dropped_total").increment(duplicates_dropped as u64);

        tracing::info!(
            rows = rows_read,
            duplicates = duplicates_dropped,
            kept = records.len(),
            "Trade log loaded"
        );

        Ok(LoadedTrades {
            records,
            rows_read,
            duplicates_dropped,
        })
    }

    fn parse_row(&self, row: &StringRecord, columns: &ColumnIndex) -> Result<TradeRecord> {
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize| row.get(idx).unwrap_or("");
        let row_err = |column: &str, msg: String| {
            PipelineError::ingest(format!("line {line}, column {column}: {msg}"))
        };

        let account_id = field(columns.account_id);
        if account_id.is_empty() {
            return Err(row_err("account_id", "empty account id".into()));
        }

        let size_usd = Amount::parse(field(columns.size_usd))
            .map_err(|e| row_err("size_usd", e))?;
        if size_usd.cmp_zero() == Ordering::Less {
            return Err(row_err("size_usd", format!("negative size {size_usd}")));
        }

        let closed_pnl = Amount::parse(field(columns.closed_pnl))
            .map_err(|e| row_err("closed_pnl", e))?;

        let timestamp = self
            .parser
            .parse(field(columns.timestamp))
            .map_err(|e| row_err("timestamp", e.to_string()))?;

        let direction = Direction::parse(field(columns.direction))
            .ok_or_else(|| row_err("direction", "empty direction".into()))?;

        Ok(TradeRecord {
            account_id: account_id.to_string(),
            size_usd,
            closed_pnl,
            timestamp,
            direction,
            date: self.parser.local_date(timestamp),
        })
    }
}

/// Row identity for duplicate removal. Numeric cells compare by value, so
/// `100` and `100.0` are the same field; anything else compares as text.
fn dedup_key(row: &StringRecord) -> Vec<String> {
    row.iter()
        .map(|cell| match Amount::parse(cell) {
            Ok(amount) => amount.canonical(),
            Err(_) => cell.to_owned(),
        })
        .collect()
}
