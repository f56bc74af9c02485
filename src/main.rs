use std::path::PathBuf;

use clap::Parser;

use trader_segments::config::{parse_tz, DateOrder, PipelineConfig};
use trader_segments::metrics::{init_metrics, write_metrics};
use trader_segments::pipeline;

/// Segment trading accounts into behavioral clusters from an execution log.
///
/// Every flag overrides the matching environment variable (a `.env` file is
/// read first).
#[derive(Debug, Parser)]
#[command(name = "trader-segments", version, about)]
struct Cli {
    /// Trade log CSV [env: TRADES_PATH]
    #[arg(long)]
    trades: Option<PathBuf>,

    /// Labeled profile table CSV [env: OUTPUT_PATH]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Per-cluster means CSV [env: SUMMARY_PATH]
    #[arg(long)]
    summary: Option<PathBuf>,

    /// JSON run report [env: REPORT_PATH]
    #[arg(long)]
    report: Option<PathBuf>,

    /// Prometheus textfile [env: METRICS_PATH]
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Number of clusters [env: N_CLUSTERS]
    #[arg(short = 'k', long = "clusters")]
    clusters: Option<usize>,

    /// Random seed for k-means [env: CLUSTER_SEED]
    #[arg(long)]
    seed: Option<u64>,

    /// k-means restarts [env: N_INIT]
    #[arg(long)]
    n_init: Option<usize>,

    /// Lloyd iteration cap per restart [env: MAX_ITER]
    #[arg(long)]
    max_iter: Option<usize>,

    /// Centroid shift convergence threshold [env: TOLERANCE]
    #[arg(long)]
    tolerance: Option<f64>,

    /// IANA zone for naive timestamps [env: REFERENCE_TZ]
    #[arg(long)]
    reference_tz: Option<String>,

    /// day_first or month_first [env: DATE_ORDER]
    #[arg(long)]
    date_order: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut PipelineConfig) -> anyhow::Result<()> {
        if let Some(p) = self.trades {
            config.trades_path = p;
        }
        if let Some(p) = self.output {
            config.output_path = p;
        }
        if self.summary.is_some() {
            config.summary_path = self.summary;
        }
        if self.report.is_some() {
            config.report_path = self.report;
        }
        if self.metrics.is_some() {
            config.metrics_path = self.metrics;
        }
        if let Some(k) = self.clusters {
            config.n_clusters = k;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(n) = self.n_init {
            config.n_init = n;
        }
        if let Some(n) = self.max_iter {
            config.max_iter = n;
        }
        if let Some(tol) = self.tolerance {
            config.tolerance = tol;
        }
        if let Some(name) = self.reference_tz {
            config.reference_tz = parse_tz(&name)?;
        }
        if let Some(order) = self.date_order {
            config.date_order = order.parse::<DateOrder>()?;
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env()?;
    cli.apply(&mut config)?;

    tracing::info!(
        trades = %config.trades_path.display(),
        output = %config.output_path.display(),
        k = config.n_clusters,
        seed = config.seed,
        reference_tz = config.reference_tz.name(),
        date_order = %config.date_order,
        "Starting segmentation run"
    );

    let metrics_handle = match &config.metrics_path {
        Some(_) => Some(init_metrics()?),
        None => None,
    };

    let outcome = pipeline::run(&config);

    // Export whatever was recorded, even for a failed run.
    if let (Some(path), Some(handle)) = (&config.metrics_path, &metrics_handle) {
        if let Err(e) = write_metrics(path, handle) {
            tracing::warn!(error = %e, "Failed to write metrics");
        }
    }

    let outcome = outcome.inspect_err(|e| tracing::error!(error = %e, "Segmentation run failed"))?;

    tracing::info!(
        accounts = outcome.profiles.len(),
        clusters = outcome.summary.len(),
        inertia = outcome.report.inertia,
        "Segmentation run complete"
    );
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
