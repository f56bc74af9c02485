use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::errors::{PipelineError, Result};
use crate::models::{
    AccountFeatureVector, ClusterAssignment, ClusterSummary, LabeledProfile, Projection2D,
};
use crate::output::write_atomic;

/// Join features, cluster labels and 2D coordinates on `account_id`.
///
/// Every feature row must have exactly one assignment and one projection;
/// anything else is an internal inconsistency and nothing is written.
pub fn join_profiles(
    features: &[AccountFeatureVector],
    assignments: &[ClusterAssignment<'_>],
    projections: &[Projection2D<'_>],
) -> anyhow::Result<Vec<LabeledProfile>> {
    if assignments.len() != features.len() || projections.len() != features.len() {
        return Err(anyhow!(
            "row count mismatch: {} feature rows, {} assignments, {} projections",
            features.len(),
            assignments.len(),
            projections.len()
        ));
    }

    let clusters: HashMap<&str, usize> = assignments
        .iter()
        .map(|a| (a.account_id, a.cluster_id))
        .collect();
    let coords: HashMap<&str, (f64, f64)> = projections
        .iter()
        .map(|p| (p.account_id, (p.x, p.y)))
        .collect();

    features
        .iter()
        .map(|f| {
            let id = f.account_id.as_str();
            let cluster_id = *clusters
                .get(id)
                .ok_or_else(|| anyhow!("no cluster assignment for account {id}"))?;
            let (x, y) = *coords
                .get(id)
                .ok_or_else(|| anyhow!("no projection for account {id}"))?;

            Ok(LabeledProfile {
                account_id: f.account_id.clone(),
                avg_trade_size: f.avg_trade_size,
                win_rate: f.win_rate,
                avg_trades_per_day: f.avg_trades_per_day,
                pnl_variability: f.pnl_variability,
                long_bias: f.long_bias,
                cluster_id,
                x,
                y,
            })
        })
        .collect()
}

/// Persists the labeled profile table, the pipeline's only required output.
#[derive(Debug, Clone)]
pub struct ProfileWriter {
    path: PathBuf,
}

impl ProfileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join and write in one step. Failures name the intended output path.
    pub fn write(
        &self,
        features: &[AccountFeatureVector],
        assignments: &[ClusterAssignment<'_>],
        projections: &[Projection2D<'_>],
    ) -> Result<Vec<LabeledProfile>> {
        let profiles = join_profiles(features, assignments, projections)
            .map_err(|e| PipelineError::persistence(&self.path, e))?;
        self.write_rows(&profiles)?;
        Ok(profiles)
    }

    pub fn write_rows(&self, profiles: &[LabeledProfile]) -> Result<()> {
        write_csv(&self.path, profiles)?;
        tracing::info!(
            path = %self.path.display(),
            rows = profiles.len(),
            "Profile table written"
        );
        Ok(())
    }
}

/// Per-cluster means table.
pub fn write_summary(path: &Path, summary: &[ClusterSummary]) -> Result<()> {
    write_csv(path, summary)?;
    tracing::info!(path = %path.display(), clusters = summary.len(), "Cluster summary written");
    Ok(())
}

fn write_csv<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    write_atomic(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })
}
