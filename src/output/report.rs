use std::path::Path;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::intelligence::{ClusterModel, ProjectionModel, Standardizer};
use crate::models::{ClusterSummary, FEATURE_NAMES};
use crate::output::write_atomic;

/// Machine-readable account of one run: what went in, what the fitted
/// stages looked like, and how the clusters came out.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub config: PipelineConfig,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub trades_kept: usize,
    pub accounts: usize,
    pub feature_names: Vec<String>,
    pub feature_means: Vec<f64>,
    pub feature_stds: Vec<f64>,
    pub inertia: f64,
    pub kmeans_iterations: usize,
    /// Centroids in standardized feature space, one row per cluster.
    pub centroids: Vec<Vec<f64>>,
    /// Projection directions, one row per component.
    pub projection_components: Vec<Vec<f64>>,
    pub explained_variance_ratio: Vec<f64>,
    pub clusters: Vec<ClusterSummary>,
}

impl RunReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &PipelineConfig,
        rows_read: usize,
        duplicates_dropped: usize,
        trades_kept: usize,
        scaler: &Standardizer,
        model: &ClusterModel,
        projection: &ProjectionModel,
        clusters: &[ClusterSummary],
    ) -> Self {
        Self {
            config: config.clone(),
            rows_read,
            duplicates_dropped,
            trades_kept,
            accounts: model.labels.len(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            feature_means: scaler.means.clone(),
            feature_stds: scaler.stds.clone(),
            inertia: model.inertia,
            kmeans_iterations: model.n_iter,
            centroids: model.centroids.outer_iter().map(|r| r.to_vec()).collect(),
            projection_components: projection
                .components
                .columns()
                .into_iter()
                .map(|c| c.to_vec())
                .collect(),
            explained_variance_ratio: projection.explained_variance_ratio.to_vec(),
            clusters: clusters.to_vec(),
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(&mut *out, report)?;
        Ok(())
    })?;
    tracing::info!(path = %path.display(), "Run report written");
    Ok(())
}
