//! # Segment Insights
//!
//! Analysis layered on top of `segment_forecast`: period-over-period trend
//! signals, z-score outliers, pairwise conversion significance, performance
//! tiers and alerts, gathered into one serializable [`InsightReport`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use segment_forecast::{Dataset, EngineConfig};
//! use segment_insights::InsightEngine;
//!
//! let config = EngineConfig::load(std::path::Path::new("insights.toml"))?;
//! let dataset = Dataset::from_csv_reader(std::fs::File::open("performance.csv")?, &config)?;
//!
//! let report = InsightEngine::new(config).run(&dataset)?;
//! for signal in &report.trend_signals.churn {
//!     println!("{} {} {:+.1}%", signal.subject, signal.metric, signal.change_pct);
//! }
//! println!("{}", report.to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alerts;
pub mod anomaly;
pub mod clustering;
pub mod engine;
pub mod error;
pub mod report;
pub mod significance;
pub mod trends;

pub use crate::alerts::{Alert, AlertKind};
pub use crate::anomaly::{Outlier, OutlierScanner};
pub use crate::clustering::{ClusterResult, ClusterTier, SegmentClusterer};
pub use crate::engine::InsightEngine;
pub use crate::error::{InsightError, Result};
pub use crate::report::{InsightReport, RunSummary};
pub use crate::significance::{FunnelTotals, PairwiseResult, SignificanceTester};
pub use crate::trends::{Direction, Severity, TrendDetector, TrendSignal, TrendSignals};
