//! Two-component linear projection for visualization.
//!
//! Deterministic: covariance of the centred matrix, cyclic Jacobi
//! eigendecomposition, no random starts. Each component's sign is fixed so
//! its largest-magnitude loading is positive.

use ndarray::{s, Array1, Array2, Axis};

/// Number of output coordinates.
pub const N_COMPONENTS: usize = 2;

const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_TOLERANCE: f64 = 1e-14;

/// Fitted projection
#[derive(Debug, Clone)]
pub struct ProjectionModel {
    /// Principal directions as columns (`d x 2`)
    pub components: Array2<f64>,
    /// Variance along each retained direction
    pub explained_variance: Array1<f64>,
    /// Share of total variance per retained direction
    pub explained_variance_ratio: Array1<f64>,
    /// Column means removed before projecting
    pub mean: Array1<f64>,
}

impl ProjectionModel {
    pub fn fit(data: &Array2<f64>) -> Self {
        let (n_samples, n_features) = data.dim();
        let n_components = N_COMPONENTS.min(n_features);

        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let centered = data - &mean;

        let denom = n_samples.saturating_sub(1).max(1) as f64;
        let cov = centered.t().dot(&centered) / denom;

        let (eigenvalues, eigenvectors) = symmetric_eigen(&cov);

        let mut components = eigenvectors.slice(s![.., ..n_components]).to_owned();
        for mut column in components.axis_iter_mut(Axis(1)) {
            let pivot = column
                .iter()
                .copied()
                .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            if pivot < 0.0 {
                column.mapv_inplace(|v| -v);
            }
        }

        let clamped = eigenvalues.mapv(|v| v.max(0.0));
        let explained_variance = clamped.slice(s![..n_components]).to_owned();
        let total_variance = clamped.sum();
        let explained_variance_ratio = if total_variance > 0.0 {
            &explained_variance / total_variance
        } else {
            Array1::zeros(n_components)
        };

        Self {
            components,
            explained_variance,
            explained_variance_ratio,
            mean,
        }
    }

    /// Project rows onto the retained directions (`n x 2`).
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let centered = data - &self.mean;
        centered.dot(&self.components)
    }

    pub fn fit_transform(data: &Array2<f64>) -> (Self, Array2<f64>) {
        let model = Self::fit(data);
        let projected = model.transform(data);
        (model, projected)
    }
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
/// Returns eigenvalues in descending order with matching eigenvector columns.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    let scale: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum::<f64>()
            .sqrt();
        if off <= JACOBI_TOLERANCE * scale.max(f64::MIN_POSITIVE) {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let eigenvalues = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
    let mut eigenvectors = Array2::zeros((n, n));
    for (new_idx, &old_idx) in order.iter().enumerate() {
        eigenvectors.column_mut(new_idx).assign(&v.column(old_idx));
    }

    (eigenvalues, eigenvectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_eigen_diagonal() {
        let m = array![[1.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 2.0]];
        let (values, vectors) = symmetric_eigen(&m);
        assert_eq!(values.to_vec(), vec![3.0, 2.0, 1.0]);
        assert_eq!(vectors[[1, 0]].abs(), 1.0);
    }

    #[test]
    fn test_eigen_reconstructs_matrix() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]];
        let (values, vectors) = symmetric_eigen(&m);
        let diag = Array2::from_diag(&values);
        let rebuilt = vectors.dot(&diag).dot(&vectors.t());
        for (x, y) in rebuilt.iter().zip(m.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn test_first_component_follows_dominant_axis() {
        // Variance lives almost entirely along (1, 1).
        let data = array![[-2.0, -2.1], [-1.0, -0.9], [0.0, 0.05], [1.0, 1.0], [2.0, 1.95]];
        let (model, projected) = ProjectionModel::fit_transform(&data);

        let pc1 = model.components.column(0);
        assert!((pc1[0] - pc1[1]).abs() < 0.05);
        assert!(pc1[0] > 0.0, "largest loading must be positive");
        assert!(model.explained_variance_ratio[0] > 0.99);
        assert_eq!(projected.dim(), (5, 2));
        // Projection of the centred data keeps the ordering along the axis.
        assert!(projected[[0, 0]] < projected[[4, 0]]);
    }

    #[test]
    fn test_deterministic() {
        let data = array![[1.0, 2.0, 3.0], [2.0, 1.0, 0.0], [0.5, 0.1, 4.0], [3.0, 3.0, 1.0]];
        let (_, a) = ProjectionModel::fit_transform(&data);
        let (_, b) = ProjectionModel::fit_transform(&data);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_single_row_projects_to_origin() {
        let data = array![[0.0, 0.0, 0.0, 0.0, 0.0]];
        let (model, projected) = ProjectionModel::fit_transform(&data);
        assert_eq!(projected.dim(), (1, 2));
        assert!(projected.iter().all(|v| *v == 0.0));
        assert!(model.explained_variance_ratio.iter().all(|v| *v == 0.0));
    }
}
