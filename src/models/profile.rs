use serde::{Deserialize, Serialize};

/// Column order of the feature matrix handed to scaling, clustering and projection.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "avg_trade_size",
    "win_rate",
    "avg_trades_per_day",
    "pnl_variability",
    "long_bias",
];

pub const FEATURE_COUNT: usize = 5;

/// Behavioral summary of one account. All fields are finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFeatureVector {
    pub account_id: String,
    pub avg_trade_size: f64,
    pub win_rate: f64,
    pub avg_trades_per_day: f64,
    pub pnl_variability: f64,
    pub long_bias: f64,
}

impl AccountFeatureVector {
    /// Values in `FEATURE_NAMES` order.
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.avg_trade_size,
            self.win_rate,
            self.avg_trades_per_day,
            self.pnl_variability,
            self.long_bias,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment<'a> {
    pub account_id: &'a str,
    pub cluster_id: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection2D<'a> {
    pub account_id: &'a str,
    pub x: f64,
    pub y: f64,
}

/// One row of the persisted profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledProfile {
    pub account_id: String,
    pub avg_trade_size: f64,
    pub win_rate: f64,
    pub avg_trades_per_day: f64,
    pub pnl_variability: f64,
    pub long_bias: f64,
    pub cluster_id: usize,
    pub x: f64,
    pub y: f64,
}

/// Mean raw features of one cluster, for post-hoc inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub accounts: usize,
    pub avg_trade_size: f64,
    pub win_rate: f64,
    pub avg_trades_per_day: f64,
    pub pnl_variability: f64,
    pub long_bias: f64,
}
