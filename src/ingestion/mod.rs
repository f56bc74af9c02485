pub mod loader;
pub mod schema;
pub mod timestamp;

pub use loader::{DataLoader, LoadedTrades};
pub use schema::{ColumnIndex, TradeColumn};
pub use timestamp::TimestampParser;
