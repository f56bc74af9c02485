use std::path::PathBuf;

/// Fatal pipeline failures. Statistical edge cases (single-sample variance,
/// zero-spread columns) are resolved in place and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input missing, unreadable, or failing schema / row validation.
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Invalid pipeline parameters, including a cluster count the data cannot support.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Persistence error: cannot write {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub fn ingest(msg: impl Into<String>) -> Self {
        PipelineError::Ingest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Configuration(msg.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        PipelineError::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
