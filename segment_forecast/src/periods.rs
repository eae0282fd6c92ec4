//! Trailing analysis windows
//!
//! The same aggregate → forecast → ratio pipeline is repeated for every
//! window of a fixed catalog. Segments inside a window are independent and
//! are processed in parallel; their results are collected into ordered maps.

use crate::aggregation::{aggregate_by_dimension, global_series, SegmentSeries};
use crate::config::EngineConfig;
use crate::data::{Dataset, Metric, MetricValues};
use crate::error::Result;
use crate::models::{ForecastVariant, Forecaster, MetricForecast};
use crate::ratios::{forecast_daily_ratios, forecast_totals, DatedRatios, Ratios};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Key of the unbounded window that also feeds trend, outlier and cluster analysis
pub const FULL_PERIOD: &str = "full";

/// One trailing window; `lookback_days == 0` means unbounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub key: String,
    pub lookback_days: u32,
    pub label: String,
}

impl PeriodWindow {
    pub fn new(key: &str, lookback_days: u32, label: &str) -> Self {
        Self {
            key: key.to_string(),
            lookback_days,
            label: label.to_string(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.lookback_days == 0
    }
}

/// Fixed, ordered set of windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCatalog {
    windows: Vec<PeriodWindow>,
}

impl PeriodCatalog {
    /// full, 180d, 90d, 30d
    pub fn funnel() -> Self {
        Self {
            windows: vec![
                PeriodWindow::new(FULL_PERIOD, 0, "All time"),
                PeriodWindow::new("180d", 180, "Last 180 days"),
                PeriodWindow::new("90d", 90, "Last 90 days"),
                PeriodWindow::new("30d", 30, "Last 30 days"),
            ],
        }
    }

    /// full, 180d, 90d
    pub fn dimension() -> Self {
        Self {
            windows: vec![
                PeriodWindow::new(FULL_PERIOD, 0, "All time"),
                PeriodWindow::new("180d", 180, "Last 180 days"),
                PeriodWindow::new("90d", 90, "Last 90 days"),
            ],
        }
    }

    pub fn windows(&self) -> &[PeriodWindow] {
        &self.windows
    }
}

/// Forecast and ratio output for one segment in one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentForecast {
    pub segment_value: String,
    pub model_used: ForecastVariant,
    pub history_days: usize,
    /// Actual totals over the window
    pub actuals: MetricValues,
    /// Ratios of the actual totals
    pub ratios: Ratios,
    pub forecasts: BTreeMap<Metric, MetricForecast>,
    /// Sum of estimates over the horizon
    pub forecast_totals: MetricValues,
    /// Ratios of the horizon totals
    pub forecast_ratios: Ratios,
    pub daily_forecast_ratios: Vec<DatedRatios>,
}

/// A segment that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub period: String,
    pub dimension: String,
    pub segment: String,
    pub message: String,
}

/// Everything computed for one window
#[derive(Debug, Clone, Serialize)]
pub struct PeriodResult {
    pub window: PeriodWindow,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub observation_count: usize,
    /// Totals over every row of the window, unassigned segments included
    pub totals: MetricValues,
    pub ratios: Ratios,
    /// dimension → segment value → result
    pub segments: BTreeMap<String, BTreeMap<String, SegmentForecast>>,
    pub diagnostics: Vec<Diagnostic>,
    /// Aggregated daily series, kept for downstream analysis
    #[serde(skip)]
    pub series: BTreeMap<String, BTreeMap<String, SegmentSeries>>,
    #[serde(skip)]
    pub global: SegmentSeries,
}

impl PeriodResult {
    /// Daily series of every segment along `dimension`
    pub fn dimension_series(&self, dimension: &str) -> Option<&BTreeMap<String, SegmentSeries>> {
        self.series.get(dimension)
    }
}

/// Runs the per-window pipeline
#[derive(Debug, Clone)]
pub struct PeriodFramer<'a> {
    config: &'a EngineConfig,
    forecaster: Forecaster,
}

impl<'a> PeriodFramer<'a> {
    pub fn new(config: &'a EngineConfig) -> Result<Self> {
        Ok(Self {
            config,
            forecaster: Forecaster::new(config.horizon, config.interval_width)?,
        })
    }

    /// Frame every window of the configured catalog, keyed by window key
    pub fn frame_all(&self, dataset: &Dataset) -> BTreeMap<String, PeriodResult> {
        self.config
            .windows()
            .iter()
            .map(|window| (window.key.clone(), self.frame_window(dataset, window)))
            .collect()
    }

    /// Aggregate, forecast and synthesize ratios for one window
    pub fn frame_window(&self, dataset: &Dataset, window: &PeriodWindow) -> PeriodResult {
        let subset = dataset.trailing(window.lookback_days);
        debug!(
            period = %window.key,
            rows = subset.len(),
            of = dataset.len(),
            "framed trailing window"
        );

        let global = global_series(&subset);
        let totals = global.totals();
        let mut segments = BTreeMap::new();
        let mut series = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for dimension in &self.config.dimensions {
            let by_segment =
                aggregate_by_dimension(&subset, dimension, |v| self.config.is_unassigned(v));

            let outcomes: Vec<(String, Result<SegmentForecast>)> = by_segment
                .par_iter()
                .map(|(value, s)| (value.clone(), self.forecast_segment(s)))
                .collect();

            let mut results = BTreeMap::new();
            for (value, outcome) in outcomes {
                match outcome {
                    Ok(result) => {
                        results.insert(value, result);
                    }
                    Err(err) => {
                        warn!(period = %window.key, %dimension, segment = %value, error = %err, "segment skipped");
                        diagnostics.push(Diagnostic {
                            period: window.key.clone(),
                            dimension: dimension.clone(),
                            segment: value,
                            message: err.to_string(),
                        });
                    }
                }
            }

            segments.insert(dimension.clone(), results);
            series.insert(dimension.clone(), by_segment);
        }

        PeriodResult {
            window: window.clone(),
            start_date: subset.min_date(),
            end_date: subset.max_date(),
            observation_count: subset.len(),
            totals,
            ratios: Ratios::from_values(&totals),
            segments,
            diagnostics,
            series,
            global,
        }
    }

    /// Forecast one segment series and derive its ratios
    pub fn forecast_segment(&self, series: &SegmentSeries) -> Result<SegmentForecast> {
        let forecast = self.forecaster.forecast_series(series)?;
        let actuals = series.totals();
        let forecast_totals = forecast_totals(&forecast);
        let daily_forecast_ratios = forecast_daily_ratios(&forecast);

        Ok(SegmentForecast {
            segment_value: forecast.segment_value,
            model_used: forecast.model_used,
            history_days: forecast.history_days,
            actuals,
            ratios: Ratios::from_values(&actuals),
            forecasts: forecast.metrics,
            forecast_totals,
            forecast_ratios: Ratios::from_values(&forecast_totals),
            daily_forecast_ratios,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogs() {
        let funnel: Vec<u32> = PeriodCatalog::funnel()
            .windows()
            .iter()
            .map(|w| w.lookback_days)
            .collect();
        assert_eq!(funnel, vec![0, 180, 90, 30]);

        let catalog = PeriodCatalog::dimension();
        let windows = catalog.windows();
        let dimension: Vec<&str> = windows.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(dimension, vec!["full", "180d", "90d"]);
        assert!(windows[0].is_full());
    }
}
