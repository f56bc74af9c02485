use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use metrics::gauge;
use rayon::prelude::*;

use crate::models::{AccountFeatureVector, Amount, TradeRecord};

/// Aggregate trades into one feature vector per account, ordered by
/// `account_id`. Accounts are independent, so they are computed in parallel.
pub fn engineer_features(records: &[TradeRecord]) -> Vec<AccountFeatureVector> {
    let mut by_account: BTreeMap<&str, Vec<&TradeRecord>> = BTreeMap::new();
    for record in records {
        by_account
            .entry(record.account_id.as_str())
            .or_default()
            .push(record);
    }

    let groups: Vec<(&str, Vec<&TradeRecord>)> = by_account.into_iter().collect();
    let features: Vec<AccountFeatureVector> = groups
        .into_par_iter()
        .map(|(account_id, trades)| account_features(account_id, &trades))
        .collect();

    gauge!("accounts_profiled").set(features.len() as f64);
    tracing::info!(accounts = features.len(), "Account features engineered");

    features
}

/// Compute all five features from a single account's trades.
pub fn account_features(account_id: &str, trades: &[&TradeRecord]) -> AccountFeatureVector {
    AccountFeatureVector {
        account_id: account_id.to_string(),
        avg_trade_size: finite_or_zero(avg_trade_size(trades)),
        win_rate: finite_or_zero(win_rate(trades)),
        avg_trades_per_day: finite_or_zero(avg_trades_per_day(trades)),
        pnl_variability: finite_or_zero(pnl_variability(trades)),
        long_bias: finite_or_zero(long_bias(trades)),
    }
}

// ---------------------------------------------------------------------------
// Feature 1: Average trade size
// ---------------------------------------------------------------------------

/// Exact decimal mean when it fits; falls back to `f64` for sums beyond
/// `Decimal` range.
pub fn avg_trade_size(trades: &[&TradeRecord]) -> f64 {
    let sizes: Vec<Amount> = trades.iter().map(|t| t.size_usd).collect();
    Amount::mean(&sizes)
}

// ---------------------------------------------------------------------------
// Feature 2: Win rate
// ---------------------------------------------------------------------------

/// Fraction of trades with strictly positive closed PnL; break-even is not a win.
pub fn win_rate(trades: &[&TradeRecord]) -> f64 {
    fraction(trades, |t| t.is_win())
}

// ---------------------------------------------------------------------------
// Feature 3: Trades per active day
// ---------------------------------------------------------------------------

/// Mean of the per-day trade counts over the days the account traded.
/// Idle days between active days do not count as zero.
pub fn avg_trades_per_day(trades: &[&TradeRecord]) -> f64 {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for t in trades {
        *per_day.entry(t.date).or_default() += 1;
    }

    if per_day.is_empty() {
        return 0.0;
    }

    let total: usize = per_day.values().sum();
    total as f64 / per_day.len() as f64
}

// ---------------------------------------------------------------------------
// Feature 4: PnL variability
// ---------------------------------------------------------------------------

/// Sample standard deviation (n - 1) of closed PnL. Zero for fewer than two trades.
pub fn pnl_variability(trades: &[&TradeRecord]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }

    let pnl: Vec<f64> = trades
        .iter()
        .map(|t| t.closed_pnl.to_f64())
        .collect();
    let n = pnl.len() as f64;
    let mean = pnl.iter().sum::<f64>() / n;
    let variance = pnl.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);

    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Feature 5: Long bias
// ---------------------------------------------------------------------------

pub fn long_bias(trades: &[&TradeRecord]) -> f64 {
    fraction(trades, |t| t.direction.is_buy())
}

fn fraction(trades: &[&TradeRecord], pred: impl Fn(&TradeRecord) -> bool) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let hits = trades.iter().filter(|t| pred(t)).count();
    hits as f64 / trades.len() as f64
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
