use std::time::Instant;

use metrics::histogram;
use ndarray::{Array2, Axis};

use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::ingestion::DataLoader;
use crate::intelligence::{
    engineer_features, feature_matrix, summarize_clusters, ClusterAssigner, ClusterModel,
    KMeansParams, ProjectionModel, Standardizer,
};
use crate::models::{
    AccountFeatureVector, ClusterAssignment, ClusterSummary, LabeledProfile, Projection2D,
    TradeRecord,
};
use crate::output::{write_report, write_summary, ProfileWriter, RunReport};

/// In-memory result of the compute stages, before anything is persisted.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub features: Vec<AccountFeatureVector>,
    pub scaler: Standardizer,
    pub model: ClusterModel,
    pub projection: ProjectionModel,
    /// `n x 2` coordinates, rows aligned with `features`.
    pub coordinates: Array2<f64>,
}

impl Segmentation {
    pub fn assignments(&self) -> Vec<ClusterAssignment<'_>> {
        self.features
            .iter()
            .zip(&self.model.labels)
            .map(|(f, &cluster_id)| ClusterAssignment {
                account_id: &f.account_id,
                cluster_id,
            })
            .collect()
    }

    pub fn projections(&self) -> Vec<Projection2D<'_>> {
        self.features
            .iter()
            .zip(self.coordinates.axis_iter(Axis(0)))
            .map(|(f, xy)| Projection2D {
                account_id: &f.account_id,
                x: xy[0],
                y: xy[1],
            })
            .collect()
    }

    pub fn summary(&self, k: usize) -> Vec<ClusterSummary> {
        summarize_clusters(&self.features, &self.model.labels, k)
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub profiles: Vec<LabeledProfile>,
    pub summary: Vec<ClusterSummary>,
    pub report: RunReport,
}

/// Run the whole batch: load, segment, persist. Either every configured
/// output is written or an error is returned.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let loaded = timed("load", || {
        DataLoader::new(config).load_path(&config.trades_path)
    })?;

    let segmentation = segment(config, &loaded.records)?;
    let summary = segmentation.summary(config.n_clusters);

    for cluster in &summary {
        tracing::info!(
            cluster = cluster.cluster_id,
            accounts = cluster.accounts,
            avg_trade_size = cluster.avg_trade_size,
            win_rate = cluster.win_rate,
            avg_trades_per_day = cluster.avg_trades_per_day,
            pnl_variability = cluster.pnl_variability,
            long_bias = cluster.long_bias,
            "Cluster summary"
        );
    }

    let profiles = ProfileWriter::new(&config.output_path).write(
        &segmentation.features,
        &segmentation.assignments(),
        &segmentation.projections(),
    )?;

    if let Some(path) = &config.summary_path {
        write_summary(path, &summary)?;
    }

    let report = RunReport::new(
        config,
        loaded.rows_read,
        loaded.duplicates_dropped,
        loaded.records.len(),
        &segmentation.scaler,
        &segmentation.model,
        &segmentation.projection,
        &summary,
    );
    if let Some(path) = &config.report_path {
        write_report(path, &report)?;
    }

    Ok(PipelineOutput {
        profiles,
        summary,
        report,
    })
}

/// Compute stages only: features, scaling, clustering and projection.
///
/// Clustering and projection both consume the same standardized matrix;
/// neither sees the other's output.
pub fn segment(config: &PipelineConfig, records: &[TradeRecord]) -> Result<Segmentation> {
    let features = timed("features", || engineer_features(records));

    let assigner = ClusterAssigner::new(KMeansParams::from(config));
    assigner.validate(features.len())?;

    let (scaler, scaled) = timed("standardize", || {
        Standardizer::fit_transform(&feature_matrix(&features))
    });

    let model = timed("cluster", || assigner.fit(&scaled))?;

    let (projection, coordinates) = timed("project", || ProjectionModel::fit_transform(&scaled));
    tracing::info!(
        explained_variance_ratio = ?projection.explained_variance_ratio.to_vec(),
        "Projection computed"
    );

    Ok(Segmentation {
        features,
        scaler,
        model,
        projection,
        coordinates,
    })
}

fn timed<T>(stage: &'static str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    let elapsed = start.elapsed().as_secs_f64();
    histogram!("stage_duration_seconds", "stage" => stage).record(elapsed);
    tracing::debug!(stage, elapsed_secs = elapsed, "Stage finished");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipelineError;
    use crate::models::Direction;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn make_trade(account: &str, size: i64, pnl: i64, day: u32, direction: Direction) -> TradeRecord {
        let timestamp = Utc.with_ymd_and_hms(2024, 12, day, 10, 0, 0).unwrap();
        TradeRecord {
            account_id: account.into(),
            size_usd: Decimal::from(size).into(),
            closed_pnl: Decimal::from(pnl).into(),
            timestamp,
            direction,
            date: timestamp.date_naive(),
        }
    }

    fn config(k: usize) -> PipelineConfig {
        PipelineConfig {
            n_clusters: k,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_segment_rows_align_with_accounts() {
        let trades = vec![
            make_trade("A", 100, 10, 1, Direction::Buy),
            make_trade("B", 5000, -50, 1, Direction::Sell),
            make_trade("C", 120, 5, 2, Direction::Buy),
        ];
        let seg = segment(&config(2), &trades).unwrap();
        assert_eq!(seg.features.len(), 3);
        assert_eq!(seg.model.labels.len(), 3);
        assert_eq!(seg.coordinates.dim(), (3, 2));
        assert_eq!(seg.assignments()[1].account_id, "B");
        assert_eq!(seg.projections()[2].account_id, "C");
    }

    #[test]
    fn test_k_above_account_count_fails_before_clustering() {
        let trades = vec![make_trade("A", 100, 10, 1, Direction::Buy)];
        let err = segment(&config(2), &trades).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_no_trades_is_configuration_error() {
        let err = segment(&config(1), &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
