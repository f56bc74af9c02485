use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Serialize;

use crate::errors::{PipelineError, Result};

const DEFAULT_TRADES_PATH: &str = "data/trader_data.csv";
const DEFAULT_OUTPUT_PATH: &str = "outputs/trader_features_with_clusters.csv";
/// Source exports stamp trades in India Standard Time.
const DEFAULT_REFERENCE_TZ: Tz = chrono_tz::Asia::Kolkata;

/// Field order for purely numeric dates such as `02-12-2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

impl FromStr for DateOrder {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "day_first" | "dmy" => Ok(DateOrder::DayFirst),
            "month_first" | "mdy" => Ok(DateOrder::MonthFirst),
            other => Err(PipelineError::config(format!(
                "unknown date order '{other}' (expected day_first or month_first)"
            ))),
        }
    }
}

impl fmt::Display for DateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateOrder::DayFirst => write!(f, "day_first"),
            DateOrder::MonthFirst => write!(f, "month_first"),
        }
    }
}

/// Everything one pipeline run needs. Built once at start-up and handed to
/// each stage; nothing reads ambient state after this point.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    // Locations
    pub trades_path: PathBuf,
    pub output_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub metrics_path: Option<PathBuf>,

    // Clustering
    pub n_clusters: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,

    // Timestamp interpretation
    #[serde(serialize_with = "serialize_tz")]
    pub reference_tz: Tz,
    pub date_order: DateOrder,
}

fn serialize_tz<S: serde::Serializer>(tz: &Tz, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(tz.name())
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trades_path: DEFAULT_TRADES_PATH.into(),
            output_path: DEFAULT_OUTPUT_PATH.into(),
            summary_path: None,
            report_path: None,
            metrics_path: None,
            n_clusters: 4,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            reference_tz: DEFAULT_REFERENCE_TZ,
            date_order: DateOrder::DayFirst,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            trades_path: get("TRADES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.trades_path),
            output_path: get("OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            summary_path: get("SUMMARY_PATH").map(PathBuf::from),
            report_path: get("REPORT_PATH").map(PathBuf::from),
            metrics_path: get("METRICS_PATH").map(PathBuf::from),

            n_clusters: parse_or(get("N_CLUSTERS"), "N_CLUSTERS", defaults.n_clusters)?,
            seed: parse_or(get("CLUSTER_SEED"), "CLUSTER_SEED", defaults.seed)?,
            n_init: parse_or(get("N_INIT"), "N_INIT", defaults.n_init)?,
            max_iter: parse_or(get("MAX_ITER"), "MAX_ITER", defaults.max_iter)?,
            tolerance: parse_or(get("TOLERANCE"), "TOLERANCE", defaults.tolerance)?,

            reference_tz: match get("REFERENCE_TZ") {
                Some(name) => parse_tz(&name)?,
                None => defaults.reference_tz,
            },
            date_order: match get("DATE_ORDER") {
                Some(order) => order.parse()?,
                None => defaults.date_order,
            },
        })
    }

    /// Reject parameters no run could succeed with. Called before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.n_clusters < 1 {
            return Err(PipelineError::config("n_clusters must be at least 1"));
        }
        if self.n_init < 1 {
            return Err(PipelineError::config("n_init must be at least 1"));
        }
        if self.max_iter < 1 {
            return Err(PipelineError::config("max_iter must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PipelineError::config(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

pub fn parse_tz(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| PipelineError::config(format!("unknown time zone '{name}': {e}")))
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| PipelineError::config(format!("{key}='{v}' is invalid: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = PipelineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.n_clusters, 4);
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_init, 10);
        assert_eq!(config.reference_tz, chrono_tz::Asia::Kolkata);
        assert_eq!(config.date_order, DateOrder::DayFirst);
        assert!(config.summary_path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("N_CLUSTERS", "6"),
            ("CLUSTER_SEED", "7"),
            ("REFERENCE_TZ", "UTC"),
            ("DATE_ORDER", "month-first"),
            ("OUTPUT_PATH", "/tmp/out.csv"),
        ]))
        .unwrap();
        assert_eq!(config.n_clusters, 6);
        assert_eq!(config.seed, 7);
        assert_eq!(config.reference_tz, chrono_tz::UTC);
        assert_eq!(config.date_order, DateOrder::MonthFirst);
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.csv"));
    }

    #[test]
    fn test_bad_number_is_configuration_error() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("N_CLUSTERS", "four")])).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_unknown_tz_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("REFERENCE_TZ", "Mars/Olympus")]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_clusters() {
        let config = PipelineConfig {
            n_clusters: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_negative_tolerance() {
        let config = PipelineConfig {
            tolerance: -1.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
