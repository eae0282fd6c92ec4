//! # Segment Forecast
//!
//! Segment-aware daily forecasting for marketing performance data.
//!
//! ## Features
//!
//! - Normalized observations (cost, impressions, clicks, conversions, revenue)
//!   broken down by arbitrary segment dimensions
//! - Per-segment daily series aggregation
//! - Forecast model selection from history length, with a deterministic
//!   fallback chain down to the last observed value
//! - Derived ratios (CTR, CPC, CPA, CVR, ROAS) with zero-safe division
//! - Repetition of the whole pipeline over trailing windows (full, 180d, 90d, 30d)
//!
//! ## Model selection
//!
//! | days of history | model |
//! |---|---|
//! | ≥ 100 | seasonal trend, weekly + yearly |
//! | ≥ 30 | seasonal trend, weekly |
//! | ≥ 14 | weighted moving average |
//! | ≥ 7 | simple moving average |
//! | < 7 | last value |
//!
//! ## Quick Start
//!
//! ```no_run
//! use segment_forecast::{Dataset, EngineConfig, PeriodFramer};
//!
//! let config = EngineConfig::default();
//! let file = std::fs::File::open("performance.csv")?;
//! let dataset = Dataset::from_csv_reader(file, &config)?;
//!
//! let framer = PeriodFramer::new(&config)?;
//! for (key, period) in framer.frame_all(&dataset) {
//!     println!("{}: {} segments", key, period.segments["channel"].len());
//! }
//! # Ok::<(), segment_forecast::ForecastError>(())
//! ```

pub mod aggregation;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod periods;
pub mod ratios;

// Re-export commonly used types
pub use crate::aggregation::{aggregate_by_dimension, global_series, DailyPoint, SegmentSeries};
pub use crate::config::{CatalogKind, EngineConfig};
pub use crate::data::{Dataset, Metric, MetricValues, Observation};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{
    try_in_order, Attempt, ForecastPoint, ForecastResult, ForecastVariant, Forecaster,
    MetricForecast,
};
pub use crate::periods::{
    Diagnostic, PeriodCatalog, PeriodFramer, PeriodResult, PeriodWindow, SegmentForecast,
    FULL_PERIOD,
};
pub use crate::ratios::Ratios;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
