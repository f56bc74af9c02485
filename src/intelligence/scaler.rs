use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use crate::models::{AccountFeatureVector, FEATURE_COUNT};

/// Per-column mean and (population) standard deviation of one run's feature
/// matrix. Recomputed every run; never persisted as reusable model state.
#[derive(Debug, Clone, Serialize)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Standardizer {
    pub fn fit(data: &Array2<f64>) -> Self {
        let n_cols = data.ncols();
        let means = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_cols));
        let stds = if data.nrows() == 0 {
            Array1::zeros(n_cols)
        } else {
            data.std_axis(Axis(0), 0.0)
        };

        Self {
            means: means.to_vec(),
            stds: stds.to_vec(),
        }
    }

    /// `(value - mean) / std`, with a zero-spread column divided by 1 instead.
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut scaled = data.clone();
        for (j, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.means[j];
            let std = if has_spread(self.stds[j], mean) { self.stds[j] } else { 1.0 };
            column.mapv_inplace(|v| (v - mean) / std);
        }
        scaled
    }

    pub fn fit_transform(data: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(data);
        let scaled = scaler.transform(data);
        (scaler, scaled)
    }
}

/// A column whose spread is only summation round-off counts as constant.
fn has_spread(std: f64, mean: f64) -> bool {
    std > 1e-12 * mean.abs().max(1.0)
}

/// Stack feature vectors row-wise in `FEATURE_NAMES` order.
pub fn feature_matrix(features: &[AccountFeatureVector]) -> Array2<f64> {
    let mut matrix = Array2::zeros((features.len(), FEATURE_COUNT));
    for (mut row, f) in matrix.axis_iter_mut(Axis(0)).zip(features) {
        for (cell, v) in row.iter_mut().zip(f.values()) {
            *cell = v;
        }
    }
    matrix
}
