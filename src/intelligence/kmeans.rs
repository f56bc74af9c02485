use metrics::gauge;
use ndarray::{Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};

/// Explicit k-means parameters. The seed and restart count are part of the
/// reproducibility contract: same input + same params = same labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl From<&PipelineConfig> for KMeansParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            n_clusters: config.n_clusters,
            n_init: config.n_init,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
            seed: config.seed,
        }
    }
}

/// Winning partition of a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    /// One label in `[0, k)` per input row.
    pub labels: Vec<usize>,
    /// `k x d` centroids in the space that was clustered.
    pub centroids: Array2<f64>,
    /// Total within-cluster squared distance.
    pub inertia: f64,
    /// Lloyd iterations of the winning restart.
    pub n_iter: usize,
}

/// Partitions standardized feature rows into `k` groups with k-means++
/// seeding and several independent restarts.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAssigner {
    params: KMeansParams,
}

impl ClusterAssigner {
    pub fn new(params: KMeansParams) -> Self {
        Self { params }
    }

    /// Fails with `ConfigurationError` if `k` is 0 or exceeds the row count.
    pub fn validate(&self, n_rows: usize) -> Result<()> {
        let k = self.params.n_clusters;
        if k < 1 {
            return Err(PipelineError::config("cluster count must be at least 1"));
        }
        if k > n_rows {
            return Err(PipelineError::config(format!(
                "cluster count {k} exceeds the number of distinct accounts ({n_rows})"
            )));
        }
        Ok(())
    }

    pub fn fit(&self, data: &Array2<f64>) -> Result<ClusterModel> {
        self.validate(data.nrows())?;

        // Restart seeds are drawn up front so the parallel restarts stay reproducible.
        let mut master = ChaCha20Rng::seed_from_u64(self.params.seed);
        let run_seeds: Vec<u64> = (0..self.params.n_init).map(|_| master.gen()).collect();

        let runs: Vec<ClusterModel> = run_seeds
            .par_iter()
            .map(|&seed| self.single_run(data, seed))
            .collect();

        let mut best: Option<ClusterModel> = None;
        for (i, run) in runs.into_iter().enumerate() {
            tracing::debug!(restart = i, inertia = run.inertia, iterations = run.n_iter, "k-means restart");
            let better = best.as_ref().map_or(true, |b| run.inertia < b.inertia);
            if better {
                best = Some(run);
            }
        }

        // Zero restarts leave nothing to pick from.
        let best = best.ok_or_else(|| PipelineError::config("n_init must be at least 1"))?;
        gauge!("kmeans_inertia").set(best.inertia);
        tracing::info!(
            k = self.params.n_clusters,
            restarts = self.params.n_init,
            inertia = best.inertia,
            iterations = best.n_iter,
            "Clustering complete"
        );

        Ok(best)
    }

    fn single_run(&self, data: &Array2<f64>, seed: u64) -> ClusterModel {
        let k = self.params.n_clusters;
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let mut centroids = kmeans_plus_plus(data, k, &mut rng);
        let mut labels = assign(data, &centroids);
        let mut n_iter = 0;

        for iter in 1..=self.params.max_iter {
            n_iter = iter;
            relocate_empty_clusters(data, &centroids, &mut labels, k);
            let updated = compute_centroids(data, &labels, k);

            let shift: f64 = centroids
                .axis_iter(Axis(0))
                .zip(updated.axis_iter(Axis(0)))
                .map(|(a, b)| squared_distance(a, b))
                .sum();

            centroids = updated;
            labels = assign(data, &centroids);

            if shift <= self.params.tolerance {
                break;
            }
        }

        // The final assignment can leave a cluster empty; repair once more so
        // every label in [0, k) is used.
        if relocate_empty_clusters(data, &centroids, &mut labels, k) {
            centroids = compute_centroids(data, &labels, k);
        }

        let inertia = inertia(data, &centroids, &labels);
        ClusterModel {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// k-means++: each next centre is drawn with probability proportional to its
/// squared distance from the nearest centre chosen so far.
fn kmeans_plus_plus(data: &Array2<f64>, k: usize, rng: &mut ChaCha20Rng) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    let mut closest: Vec<f64> = data
        .axis_iter(Axis(0))
        .map(|p| squared_distance(p, centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, d) in closest.iter().enumerate() {
                cumulative += d;
                if *d > 0.0 && cumulative > target {
                    chosen = Some(i);
                    break;
                }
            }
            // Round-off can leave target just above the running sum.
            chosen.unwrap_or_else(|| closest.iter().rposition(|d| *d > 0.0).unwrap_or(0))
        } else {
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(pick));
        for (i, p) in data.axis_iter(Axis(0)).enumerate() {
            let d = squared_distance(p, centroids.row(c));
            if d < closest[i] {
                closest[i] = d;
            }
        }
    }

    centroids
}

// ---------------------------------------------------------------------------
// Lloyd steps
// ---------------------------------------------------------------------------

/// Nearest centroid per row; ties go to the lowest cluster index.
fn assign(data: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    data.axis_iter(Axis(0))
        .map(|p| nearest(p, centroids).0)
        .collect()
}

fn nearest(point: ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

fn compute_centroids(data: &Array2<f64>, labels: &[usize], k: usize) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, data.ncols()));
    let mut counts = vec![0usize; k];

    for (p, &label) in data.axis_iter(Axis(0)).zip(labels) {
        let mut row = sums.row_mut(label);
        row += &p;
        counts[label] += 1;
    }

    for (c, mut row) in sums.axis_iter_mut(Axis(0)).enumerate() {
        if counts[c] > 0 {
            row /= counts[c] as f64;
        }
    }
    sums
}

/// Move the points farthest from their centroid into empty clusters, never
/// emptying a donor cluster. Returns true if any label changed.
fn relocate_empty_clusters(
    data: &Array2<f64>,
    centroids: &Array2<f64>,
    labels: &mut [usize],
    k: usize,
) -> bool {
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    let empty: Vec<usize> = (0..k).filter(|c| counts[*c] == 0).collect();
    if empty.is_empty() {
        return false;
    }

    let mut by_distance: Vec<(usize, f64)> = data
        .axis_iter(Axis(0))
        .zip(labels.iter())
        .map(|(p, &label)| squared_distance(p, centroids.row(label)))
        .enumerate()
        .collect();
    // Farthest first; equal distances keep row order.
    by_distance.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut donors = by_distance.into_iter().map(|(i, _)| i);
    for cluster in empty {
        for i in donors.by_ref() {
            let from = labels[i];
            if counts[from] > 1 {
                counts[from] -= 1;
                counts[cluster] += 1;
                labels[i] = cluster;
                break;
            }
        }
    }
    true
}

fn inertia(data: &Array2<f64>, centroids: &Array2<f64>, labels: &[usize]) -> f64 {
    data.axis_iter(Axis(0))
        .zip(labels)
        .map(|(p, &label)| squared_distance(p, centroids.row(label)))
        .sum()
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params(k: usize, seed: u64) -> KMeansParams {
        KMeansParams {
            n_clusters: k,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed,
        }
    }

    /// Three tight, well-separated blobs in 2D.
    fn blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
            [-10.0, 10.0],
            [-10.1, 10.0],
            [-10.0, 10.1],
        ]
    }

    #[test]
    fn test_separates_blobs() {
        let model = ClusterAssigner::new(params(3, 42)).fit(&blobs()).unwrap();
        let l = &model.labels;
        assert_eq!(l[0], l[1]);
        assert_eq!(l[0], l[2]);
        assert_eq!(l[3], l[4]);
        assert_eq!(l[3], l[5]);
        assert_eq!(l[6], l[7]);
        assert_eq!(l[6], l[8]);
        assert_ne!(l[0], l[3]);
        assert_ne!(l[0], l[6]);
        assert_ne!(l[3], l[6]);
        assert!(model.inertia < 0.1);
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let data = blobs();
        let a = ClusterAssigner::new(params(3, 7)).fit(&data).unwrap();
        let b = ClusterAssigner::new(params(3, 7)).fit(&data).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia.to_bits(), b.inertia.to_bits());
        for (x, y) in a.centroids.iter().zip(b.centroids.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_single_cluster() {
        let model = ClusterAssigner::new(params(1, 42)).fit(&blobs()).unwrap();
        assert!(model.labels.iter().all(|&l| l == 0));
        assert_eq!(model.centroids.nrows(), 1);
    }

    #[test]
    fn test_k_equals_n_uses_every_label() {
        let data = array![[0.0], [1.0], [5.0], [9.0]];
        let model = ClusterAssigner::new(params(4, 3)).fit(&data).unwrap();
        let mut labels = model.labels.clone();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2, 3]);
        assert!(model.inertia.abs() < 1e-12);
    }

    #[test]
    fn test_identical_points_still_fill_all_clusters() {
        let data = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let model = ClusterAssigner::new(params(3, 42)).fit(&data).unwrap();
        let mut labels = model.labels.clone();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_k_exceeding_rows_is_configuration_error() {
        let err = ClusterAssigner::new(params(5, 42))
            .fit(&array![[0.0], [1.0]])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_k_zero_is_configuration_error() {
        let err = ClusterAssigner::new(params(0, 42)).fit(&blobs()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_zero_restarts_is_configuration_error() {
        let params = KMeansParams {
            n_init: 0,
            ..params(2, 42)
        };
        let assigner = ClusterAssigner::new(params);
        assert!(assigner.validate(9).is_ok());
        let err = assigner.fit(&blobs()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_relocate_moves_farthest_point() {
        let data = array![[0.0], [0.1], [8.0]];
        let centroids = array![[0.0], [100.0]];
        let mut labels = vec![0, 0, 0];
        assert!(relocate_empty_clusters(&data, &centroids, &mut labels, 2));
        assert_eq!(labels, vec![0, 0, 1]);
    }
}
