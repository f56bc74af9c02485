pub mod config;
pub mod errors;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod output;
pub mod pipeline;

pub use config::PipelineConfig;
pub use errors::{PipelineError, Result};
pub use pipeline::{run, PipelineOutput};
