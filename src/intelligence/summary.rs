use crate::models::{AccountFeatureVector, ClusterSummary, FEATURE_COUNT};

/// Member count and mean raw features per cluster, for naming archetypes
/// after the fact. Clusters with no members are omitted.
pub fn summarize_clusters(
    features: &[AccountFeatureVector],
    labels: &[usize],
    k: usize,
) -> Vec<ClusterSummary> {
    let mut sums = vec![[0.0f64; FEATURE_COUNT]; k];
    let mut counts = vec![0usize; k];

    for (f, &label) in features.iter().zip(labels) {
        counts[label] += 1;
        for (acc, v) in sums[label].iter_mut().zip(f.values()) {
            *acc += v;
        }
    }

    (0..k)
        .filter(|&c| counts[c] > 0)
        .map(|c| {
            let n = counts[c] as f64;
            let [avg_trade_size, win_rate, avg_trades_per_day, pnl_variability, long_bias] =
                sums[c].map(|s| s / n);
            ClusterSummary {
                cluster_id: c,
                accounts: counts[c],
                avg_trade_size,
                win_rate,
                avg_trades_per_day,
                pnl_variability,
                long_bias,
            }
        })
        .collect()
}
