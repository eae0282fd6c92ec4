//! # Funnel Insights
//!
//! Segment-aware forecasting and insight generation for marketing
//! performance data. This crate re-exports the workspace members:
//!
//! - [`math`]: safe ratios, moving averages, z-scores, chi-square, k-means
//! - [`forecast`]: data model, aggregation, forecasting, ratios and trailing windows
//! - [`insights`]: trends, outliers, significance, clustering, alerts and the report
//!
//! ## Example
//!
//! ```
//! use funnel_insights_workspace::forecast::{Dataset, EngineConfig, MetricValues, Observation};
//! use funnel_insights_workspace::insights::InsightEngine;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dataset = Dataset::new(vec![
//!     Observation::new(date, MetricValues::new(100.0, 5000.0, 120.0, 6.0, 240.0))
//!         .with_segment("channel", "Search"),
//! ]);
//!
//! let report = InsightEngine::new(EngineConfig::default()).run(&dataset).unwrap();
//! let search = &report.full_period().unwrap().segments["channel"]["Search"];
//! assert_eq!(search.ratios.roas, 240.0);
//! ```

pub use insight_math as math;
pub use segment_forecast as forecast;
pub use segment_insights as insights;

pub use segment_forecast::{Dataset, EngineConfig};
pub use segment_insights::{InsightEngine, InsightError, InsightReport};
