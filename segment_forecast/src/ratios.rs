//! Derived efficiency ratios
//!
//! Every ratio goes through [`safe_divide`], so a zero or invalid denominator
//! yields exactly `0.0`.

use crate::data::{Metric, MetricValues};
use crate::models::ForecastResult;
use chrono::NaiveDate;
use insight_math::safe_divide;
use serde::{Deserialize, Serialize};

/// CTR, CPC, CPA, CVR and ROAS of a set of metric values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    /// clicks / impressions * 100
    pub ctr: f64,
    /// cost / clicks
    pub cpc: f64,
    /// cost / conversions
    pub cpa: f64,
    /// conversions / clicks * 100
    pub cvr: f64,
    /// revenue / cost * 100
    pub roas: f64,
}

impl Ratios {
    pub fn from_values(values: &MetricValues) -> Self {
        Self {
            ctr: ctr(values.clicks, values.impressions),
            cpc: cpc(values.cost, values.clicks),
            cpa: cpa(values.cost, values.conversions),
            cvr: cvr(values.conversions, values.clicks),
            roas: roas(values.revenue, values.cost),
        }
    }
}

pub fn ctr(clicks: f64, impressions: f64) -> f64 {
    safe_divide(clicks, impressions) * 100.0
}

pub fn cpc(cost: f64, clicks: f64) -> f64 {
    safe_divide(cost, clicks)
}

pub fn cpa(cost: f64, conversions: f64) -> f64 {
    safe_divide(cost, conversions)
}

pub fn cvr(conversions: f64, clicks: f64) -> f64 {
    safe_divide(conversions, clicks) * 100.0
}

pub fn roas(revenue: f64, cost: f64) -> f64 {
    safe_divide(revenue, cost) * 100.0
}

/// Metric values and their ratios on one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedRatios {
    pub date: NaiveDate,
    pub values: MetricValues,
    pub ratios: Ratios,
}

/// Ratios for every forecast date, computed from the point estimates
pub fn forecast_daily_ratios(forecast: &ForecastResult) -> Vec<DatedRatios> {
    let Some(reference) = forecast.metrics.values().next() else {
        return Vec::new();
    };

    reference
        .points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let values = MetricValues::from_fn(|metric| estimate_at(forecast, metric, i));
            DatedRatios {
                date: point.date,
                values,
                ratios: Ratios::from_values(&values),
            }
        })
        .collect()
}

/// Sum of point estimates over the horizon, per metric
pub fn forecast_totals(forecast: &ForecastResult) -> MetricValues {
    MetricValues::from_fn(|metric| {
        forecast
            .metrics
            .get(&metric)
            .map(|f| f.total())
            .unwrap_or(0.0)
    })
}

fn estimate_at(forecast: &ForecastResult, metric: Metric, index: usize) -> f64 {
    forecast
        .metrics
        .get(&metric)
        .and_then(|f| f.points.get(index))
        .map(|p| p.estimate)
        .unwrap_or(0.0)
}
