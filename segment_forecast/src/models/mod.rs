//! Forecasting models for segment series
//!
//! A series is mapped to a [`ForecastVariant`] by its number of observation
//! days. Fitting walks the fixed fallback chain from the selected variant
//! towards [`ForecastVariant::LastValue`], so a series with at least one point
//! always yields a forecast of exactly `horizon` points.

use crate::aggregation::SegmentSeries;
use crate::data::Metric;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

pub mod moving_average;
pub mod seasonal_trend;

/// Minimum observation days for each variant
pub const SEASONAL_YEARLY_MIN_DAYS: usize = 100;
pub const SEASONAL_WEEKLY_MIN_DAYS: usize = 30;
pub const WEIGHTED_MA_MIN_DAYS: usize = 14;
pub const SIMPLE_MA_MIN_DAYS: usize = 7;

/// Calendar span a series must cover before yearly seasonality is fitted
pub const YEARLY_SPAN_DAYS: i64 = 365;

/// Forecast strategy, from richest to simplest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastVariant {
    /// Additive trend plus weekly (and optionally yearly) seasonality
    SeasonalTrend { yearly: bool },
    /// Linearly weighted mean of the last 14 points
    WeightedMovingAverage,
    /// Mean of the last 7 points
    SimpleMovingAverage,
    /// Most recent point repeated
    LastValue,
}

impl ForecastVariant {
    /// Fallback order; a failing variant hands over to the next entry
    pub const CHAIN: [ForecastVariant; 5] = [
        ForecastVariant::SeasonalTrend { yearly: true },
        ForecastVariant::SeasonalTrend { yearly: false },
        ForecastVariant::WeightedMovingAverage,
        ForecastVariant::SimpleMovingAverage,
        ForecastVariant::LastValue,
    ];

    /// Pick a variant from the number of distinct observation days
    pub fn select(days_available: usize) -> Self {
        match days_available {
            d if d >= SEASONAL_YEARLY_MIN_DAYS => ForecastVariant::SeasonalTrend { yearly: true },
            d if d >= SEASONAL_WEEKLY_MIN_DAYS => ForecastVariant::SeasonalTrend { yearly: false },
            d if d >= WEIGHTED_MA_MIN_DAYS => ForecastVariant::WeightedMovingAverage,
            d if d >= SIMPLE_MA_MIN_DAYS => ForecastVariant::SimpleMovingAverage,
            _ => ForecastVariant::LastValue,
        }
    }

    /// Yearly seasonality needs a history spanning [`YEARLY_SPAN_DAYS`];
    /// shorter spans resolve to the weekly-only variant
    pub fn for_span(self, span_days: i64) -> Self {
        match self {
            ForecastVariant::SeasonalTrend { yearly: true } if span_days < YEARLY_SPAN_DAYS => {
                ForecastVariant::SeasonalTrend { yearly: false }
            }
            other => other,
        }
    }

    /// This variant followed by every simpler one
    pub fn fallback_chain(self) -> &'static [ForecastVariant] {
        let chain: &'static [ForecastVariant; 5] = &Self::CHAIN;
        let start = chain.iter().position(|v| *v == self).unwrap_or(0);
        &chain[start..]
    }

    /// Short stable label
    pub fn label(&self) -> &'static str {
        match self {
            ForecastVariant::SeasonalTrend { yearly: true } => "seasonal_trend_weekly_yearly",
            ForecastVariant::SeasonalTrend { yearly: false } => "seasonal_trend_weekly",
            ForecastVariant::WeightedMovingAverage => "weighted_moving_average",
            ForecastVariant::SimpleMovingAverage => "simple_moving_average",
            ForecastVariant::LastValue => "last_value",
        }
    }
}

impl fmt::Display for ForecastVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One forecast day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ForecastPoint {
    /// Build a point with every bound clamped to be non-negative and ordered
    /// `lower <= estimate <= upper`
    pub fn clamped(date: NaiveDate, estimate: f64, lower: f64, upper: f64) -> Self {
        let estimate = estimate.max(0.0);
        Self {
            date,
            estimate,
            lower: lower.max(0.0).min(estimate),
            upper: upper.max(estimate),
        }
    }
}

/// Forecast of a single metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricForecast {
    /// Variant that actually produced the points (after any fallback)
    pub model_used: ForecastVariant,
    pub points: Vec<ForecastPoint>,
}

impl MetricForecast {
    /// Create a metric forecast, checking it covers the horizon
    pub fn new(model_used: ForecastVariant, points: Vec<ForecastPoint>, horizon: usize) -> Result<Self> {
        if points.len() != horizon {
            return Err(ForecastError::ModelFit(format!(
                "{} produced {} points for a horizon of {}",
                model_used,
                points.len(),
                horizon
            )));
        }
        Ok(Self { model_used, points })
    }

    /// Sum of point estimates over the horizon
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.estimate).sum()
    }
}

/// Per-metric forecasts of one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub dimension: String,
    pub segment_value: String,
    /// Variant chosen from the segment's history length
    pub model_used: ForecastVariant,
    pub history_days: usize,
    pub metrics: BTreeMap<Metric, MetricForecast>,
}

/// Outcome of walking a fallback chain
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    Fitted {
        variant: ForecastVariant,
        value: T,
        /// Variants tried before `variant`, with their failure messages
        failures: Vec<(ForecastVariant, String)>,
    },
    Exhausted {
        failures: Vec<(ForecastVariant, String)>,
    },
}

/// Try each variant in order, stopping at the first success. No variant is
/// attempted twice.
pub fn try_in_order<T>(
    chain: &[ForecastVariant],
    mut fit: impl FnMut(ForecastVariant) -> Result<T>,
) -> Attempt<T> {
    let mut failures = Vec::new();
    for &variant in chain {
        if failures.iter().any(|(tried, _)| *tried == variant) {
            continue;
        }
        match fit(variant) {
            Ok(value) => {
                return Attempt::Fitted {
                    variant,
                    value,
                    failures,
                }
            }
            Err(err) => failures.push((variant, err.to_string())),
        }
    }
    Attempt::Exhausted { failures }
}

/// Produces fixed-horizon forecasts for segment series
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    horizon: usize,
    interval_width: f64,
}

impl Forecaster {
    /// Create a forecaster for `horizon` days with the given interval coverage
    pub fn new(horizon: usize, interval_width: f64) -> Result<Self> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be at least one day".to_string(),
            ));
        }
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Interval width must be between 0 and 1".to_string(),
            ));
        }
        Ok(Self {
            horizon,
            interval_width,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn interval_width(&self) -> f64 {
        self.interval_width
    }

    /// Forecast every metric of `series` with the variant its length selects
    pub fn forecast_series(&self, series: &SegmentSeries) -> Result<ForecastResult> {
        if series.is_empty() {
            return Err(ForecastError::InsufficientData(format!(
                "{}={} has no observations",
                series.dimension, series.segment_value
            )));
        }

        let selected = ForecastVariant::select(series.days()).for_span(series.span_days());
        debug!(
            dimension = %series.dimension,
            segment = %series.segment_value,
            days = series.days(),
            model = %selected,
            "selected forecast model"
        );

        let metrics = Metric::ALL
            .iter()
            .map(|&metric| Ok((metric, self.forecast_metric(series, selected, metric)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(ForecastResult {
            dimension: series.dimension.clone(),
            segment_value: series.segment_value.clone(),
            model_used: selected,
            history_days: series.days(),
            metrics,
        })
    }

    /// Forecast one metric, falling back through simpler variants on failure
    pub fn forecast_metric(
        &self,
        series: &SegmentSeries,
        variant: ForecastVariant,
        metric: Metric,
    ) -> Result<MetricForecast> {
        let dates = series.dates();
        let values = series.metric_values(metric);
        self.forecast_values(&dates, &values, variant)
            .map_err(|err| match err {
                ForecastError::InsufficientData(msg) => ForecastError::InsufficientData(format!(
                    "{}={} {}: {}",
                    series.dimension, series.segment_value, metric, msg
                )),
                other => other,
            })
    }

    /// Forecast a raw dated series
    pub fn forecast_values(
        &self,
        dates: &[NaiveDate],
        values: &[f64],
        variant: ForecastVariant,
    ) -> Result<MetricForecast> {
        if values.is_empty() || dates.len() != values.len() {
            return Err(ForecastError::InsufficientData(format!(
                "need at least one dated point, have {} dates and {} values",
                dates.len(),
                values.len()
            )));
        }

        let variant = variant.for_span(span_days(dates));
        let attempt = try_in_order(variant.fallback_chain(), |candidate| {
            self.fit_variant(candidate, dates, values)
        });

        match attempt {
            Attempt::Fitted {
                variant: used,
                value,
                failures,
            } => {
                for (failed, reason) in &failures {
                    warn!(model = %failed, fallback = %used, %reason, "forecast model failed, falling back");
                }
                MetricForecast::new(used, value, self.horizon)
            }
            Attempt::Exhausted { failures } => Err(ForecastError::FallbackExhausted(
                failures
                    .into_iter()
                    .map(|(v, reason)| format!("{}: {}", v, reason))
                    .collect(),
            )),
        }
    }

    fn fit_variant(
        &self,
        variant: ForecastVariant,
        dates: &[NaiveDate],
        values: &[f64],
    ) -> Result<Vec<ForecastPoint>> {
        let last_date = *dates.last().ok_or_else(|| {
            ForecastError::InsufficientData("series has no dates".to_string())
        })?;
        let future = future_dates(last_date, self.horizon);

        match variant {
            ForecastVariant::SeasonalTrend { yearly } => {
                seasonal_trend::forecast(dates, values, &future, self.interval_width, yearly)
            }
            ForecastVariant::WeightedMovingAverage => {
                moving_average::weighted(values, &future, self.interval_width)
            }
            ForecastVariant::SimpleMovingAverage => {
                moving_average::simple(values, &future, self.interval_width)
            }
            ForecastVariant::LastValue => {
                moving_average::last_value(values, &future, self.interval_width)
            }
        }
    }
}

/// The `horizon` calendar days following `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|i| last_date + Duration::days(i))
        .collect()
}

/// Calendar days covered by sorted `dates`, both ends included
pub fn span_days(dates: &[NaiveDate]) -> i64 {
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (*last - *first).num_days() + 1,
        _ => 0,
    }
}

/// Two-sided standard-normal multiplier for a central interval of `width`
pub(crate) fn normal_multiplier(width: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::ModelFit(format!("normal distribution: {}", e)))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_chain_starts_at_variant() {
        let chain = ForecastVariant::WeightedMovingAverage.fallback_chain();
        assert_eq!(
            chain,
            &[
                ForecastVariant::WeightedMovingAverage,
                ForecastVariant::SimpleMovingAverage,
                ForecastVariant::LastValue,
            ]
        );
        assert_eq!(ForecastVariant::LastValue.fallback_chain().len(), 1);
    }

    #[test]
    fn test_try_in_order_stops_at_first_success() {
        let mut tried = Vec::new();
        let attempt = try_in_order(&ForecastVariant::CHAIN, |v| {
            tried.push(v);
            match v {
                ForecastVariant::SeasonalTrend { .. } => {
                    Err(ForecastError::ModelFit("did not converge".to_string()))
                }
                _ => Ok(1),
            }
        });
        assert_eq!(tried.len(), 3);
        match attempt {
            Attempt::Fitted {
                variant, failures, ..
            } => {
                assert_eq!(variant, ForecastVariant::WeightedMovingAverage);
                assert_eq!(failures.len(), 2);
            }
            Attempt::Exhausted { .. } => panic!("expected a fitted variant"),
        }
    }

    #[test]
    fn test_try_in_order_exhausted() {
        let attempt: Attempt<()> = try_in_order(&ForecastVariant::CHAIN[3..], |_| {
            Err(ForecastError::ModelFit("nope".to_string()))
        });
        assert!(matches!(attempt, Attempt::Exhausted { failures } if failures.len() == 2));
    }

    #[test]
    fn test_short_span_resolves_to_weekly() {
        let yearly = ForecastVariant::SeasonalTrend { yearly: true };
        let weekly = ForecastVariant::SeasonalTrend { yearly: false };
        assert_eq!(yearly.for_span(200), weekly);
        assert_eq!(yearly.for_span(365), yearly);
        let simple = ForecastVariant::SimpleMovingAverage;
        assert_eq!(simple.for_span(10), simple);
        // the weekly variant is then never attempted twice
        assert_eq!(yearly.for_span(200).fallback_chain().len(), 4);
    }

    #[test]
    fn test_span_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(span_days(&[]), 0);
        assert_eq!(span_days(&[start]), 1);
        assert_eq!(span_days(&[start, start + Duration::days(9)]), 10);
    }

    #[test]
    fn test_clamped_point() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let point = ForecastPoint::clamped(date, -3.0, -10.0, 2.0);
        assert_eq!(point.estimate, 0.0);
        assert_eq!(point.lower, 0.0);
        assert_eq!(point.upper, 2.0);
    }

    #[test]
    fn test_normal_multiplier() {
        let z = normal_multiplier(0.95).unwrap();
        assert!((z - 1.959964).abs() < 1e-4);
    }
}
