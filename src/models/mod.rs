pub mod amount;
pub mod profile;
pub mod trade;

pub use amount::Amount;
pub use profile::{
    AccountFeatureVector, ClusterAssignment, ClusterSummary, LabeledProfile, Projection2D,
    FEATURE_COUNT, FEATURE_NAMES,
};
pub use trade::TradeRecord;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Trade direction as reported by the execution log.
///
/// Exports also carry position-level labels ("Open Long", "Close Short");
/// those are kept verbatim as `Other` and count as non-buy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
    Other(String),
}

impl Direction {
    /// Case-insensitive parse. Returns `None` only for blank input.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.to_lowercase().as_str() {
            "buy" => Some(Direction::Buy),
            "sell" => Some(Direction::Sell),
            _ => Some(Direction::Other(trimmed.to_string())),
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Direction::Buy)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "Buy"),
            Direction::Sell => write!(f, "Sell"),
            Direction::Other(label) => f.write_str(label),
        }
    }
}
