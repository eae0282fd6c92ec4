//! Engine configuration, loadable from TOML
//!
//! A single `EngineConfig` value is passed into a run and never mutated while
//! the run is in progress.

use crate::data::Metric;
use crate::error::{ForecastError, Result};
use crate::periods::{PeriodCatalog, PeriodWindow};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which fixed catalog of trailing windows to analyse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// full, 180d, 90d, 30d
    #[default]
    Funnel,
    /// full, 180d, 90d
    Dimension,
}

/// Top-level configuration of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of days to forecast
    pub horizon: usize,
    /// Coverage of forecast intervals, e.g. 0.8 for 80%
    pub interval_width: f64,
    /// Segment dimensions to analyse, e.g. `channel`, `brand`
    pub dimensions: Vec<String>,
    /// Window catalog
    pub catalog: CatalogKind,
    /// Ordered funnel stage columns, entry stage first and purchase stage last
    pub funnel_stages: Vec<String>,
    /// Segment values treated as "unassigned" (case-insensitive)
    pub unassigned_markers: Vec<String>,
    pub trend: TrendPolicy,
    pub outliers: OutlierPolicy,
    pub significance: SignificancePolicy,
    pub clustering: ClusteringPolicy,
    pub alerts: AlertPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            interval_width: 0.8,
            dimensions: vec!["channel".to_string()],
            catalog: CatalogKind::Funnel,
            funnel_stages: vec![
                "impressions".to_string(),
                "clicks".to_string(),
                "conversions".to_string(),
            ],
            unassigned_markers: ["", "-", "unknown", "(not set)", "none"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trend: TrendPolicy::default(),
            outliers: OutlierPolicy::default(),
            significance: SignificancePolicy::default(),
            clustering: ClusteringPolicy::default(),
            alerts: AlertPolicy::default(),
        }
    }
}

/// Period-over-period trend classification policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendPolicy {
    /// Comparison span lengths in days
    pub spans: Vec<usize>,
    /// Absolute percent change that must be exceeded to raise a signal
    pub change_threshold: f64,
    /// Absolute percent change beyond which a signal is high severity
    pub high_severity_threshold: f64,
    /// Metrics whose segment series are checked
    pub metrics: Vec<Metric>,
}

impl Default for TrendPolicy {
    fn default() -> Self {
        Self {
            spans: vec![7, 30],
            change_threshold: 20.0,
            high_severity_threshold: 30.0,
            metrics: vec![Metric::Conversions, Metric::Revenue],
        }
    }
}

/// Z-score outlier policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierPolicy {
    /// Threshold of the statistics path
    pub statistics_z: f64,
    /// Threshold of the per-row grading path
    pub grading_z: f64,
    /// Maximum outliers reported by the statistics path
    pub statistics_top: usize,
    /// Maximum anomalies reported by the grading path
    pub grading_top: usize,
    /// Metrics scanned for outliers
    pub metrics: Vec<Metric>,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self {
            statistics_z: 3.0,
            grading_z: 2.5,
            statistics_top: 10,
            grading_top: 5,
            metrics: vec![Metric::Cost, Metric::Conversions, Metric::Revenue],
        }
    }
}

/// Pairwise chi-square policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificancePolicy {
    pub alpha: f64,
    /// Every contingency cell must be strictly greater than this
    pub min_cell: f64,
    pub yates_correction: bool,
}

impl Default for SignificancePolicy {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            min_cell: 5.0,
            yates_correction: true,
        }
    }
}

/// Performance-tier clustering policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringPolicy {
    pub max_clusters: usize,
    /// Minimum number of segments with a complete feature vector
    pub min_segments: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Independent k-means seedings; the lowest-inertia partition wins
    pub restarts: usize,
}

impl Default for ClusteringPolicy {
    fn default() -> Self {
        Self {
            max_clusters: 3,
            min_segments: 3,
            seed: 42,
            max_iterations: 300,
            restarts: 10,
        }
    }
}

/// Alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    /// Segments with spend whose ROAS falls below this raise an alert
    pub min_roas: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self { min_roas: 100.0 }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The trailing windows selected by `catalog`
    pub fn windows(&self) -> Vec<PeriodWindow> {
        match self.catalog {
            CatalogKind::Funnel => PeriodCatalog::funnel(),
            CatalogKind::Dimension => PeriodCatalog::dimension(),
        }
        .windows()
        .to_vec()
    }

    /// Whether `value` denotes an unassigned segment
    pub fn is_unassigned(&self, value: &str) -> bool {
        let value = value.trim();
        self.unassigned_markers
            .iter()
            .any(|marker| marker.trim().eq_ignore_ascii_case(value))
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(invalid("horizon must be at least 1 day"));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(invalid(format!(
                "interval_width must be between 0 and 1, got {}",
                self.interval_width
            )));
        }
        if self.dimensions.is_empty() {
            return Err(invalid("at least one dimension is required"));
        }
        if self.dimensions.iter().any(|d| d.trim().is_empty()) {
            return Err(invalid("dimension names must not be empty"));
        }
        if self.funnel_stages.len() < 2 {
            return Err(invalid("funnel_stages needs an entry and a purchase stage"));
        }
        if self.trend.spans.iter().any(|&s| s == 0) {
            return Err(invalid("trend spans must be positive"));
        }
        if self.trend.change_threshold < 0.0
            || self.trend.high_severity_threshold < self.trend.change_threshold
        {
            return Err(invalid(format!(
                "trend thresholds must satisfy 0 <= change ({}) <= high ({})",
                self.trend.change_threshold, self.trend.high_severity_threshold
            )));
        }
        if self.outliers.statistics_z <= 0.0 || self.outliers.grading_z <= 0.0 {
            return Err(invalid("outlier z thresholds must be positive"));
        }
        if !(self.significance.alpha > 0.0 && self.significance.alpha < 1.0) {
            return Err(invalid(format!(
                "significance alpha must be between 0 and 1, got {}",
                self.significance.alpha
            )));
        }
        if self.clustering.max_clusters == 0 || self.clustering.max_iterations == 0 {
            return Err(invalid("clustering needs max_clusters and max_iterations >= 1"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ForecastError {
    ForecastError::Config(message.into())
}
