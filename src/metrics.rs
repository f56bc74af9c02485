use std::path::Path;

use metrics::{counter, describe_histogram, gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::errors::{PipelineError, Result};
use crate::output::write_atomic;

/// Install the Prometheus recorder and pre-register the run's metrics so the
/// exported file lists them even when a stage never fires.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| PipelineError::config(format!("failed to install metrics recorder: {e}")))?;

    counter!("trades_loaded_total").absolute(0);
    counter!("duplicate_rows_dropped_total").absolute(0);

    gauge!("accounts_profiled").set(0.0);
    gauge!("kmeans_inertia").set(0.0);
    describe_histogram!(
        "stage_duration_seconds",
        Unit::Seconds,
        "Wall time per pipeline stage"
    );

    Ok(handle)
}

/// Dump the text exposition for a node-exporter textfile collector.
pub fn write_metrics(path: &Path, handle: &PrometheusHandle) -> Result<()> {
    let body = handle.render();
    write_atomic(path, |out| {
        std::io::Write::write_all(out, body.as_bytes())?;
        Ok(())
    })?;
    tracing::info!(path = %path.display(), "Metrics written");
    Ok(())
}
