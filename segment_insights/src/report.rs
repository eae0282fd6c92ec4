//! Serializable result of an insight run

use crate::alerts::Alert;
use crate::anomaly::Outlier;
use crate::clustering::ClusterResult;
use crate::error::Result;
use crate::significance::PairwiseResult;
use crate::trends::TrendSignals;
use chrono::NaiveDate;
use segment_forecast::{Diagnostic, PeriodResult, FULL_PERIOD};
use serde::Serialize;
use std::collections::BTreeMap;

/// Input coverage and run parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub observations: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub horizon: usize,
    pub dimensions: Vec<String>,
    pub periods: Vec<String>,
}

/// Everything one run produces
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub summary: RunSummary,
    /// period key → forecasts and ratios of that window
    pub by_period: BTreeMap<String, PeriodResult>,
    pub trend_signals: TrendSignals,
    /// Statistics-path outliers of the full window
    pub outliers: Vec<Outlier>,
    /// Most severe first
    pub alerts: Vec<Alert>,
    /// dimension → pairwise chi-square results
    pub significance: BTreeMap<String, Vec<PairwiseResult>>,
    /// dimension → performance tiers
    pub clusters: BTreeMap<String, ClusterResult>,
    /// Segments left out of a period, with the reason
    pub diagnostics: Vec<Diagnostic>,
}

impl InsightReport {
    pub fn period(&self, key: &str) -> Option<&PeriodResult> {
        self.by_period.get(key)
    }

    /// The unbounded window
    pub fn full_period(&self) -> Option<&PeriodResult> {
        self.period(FULL_PERIOD)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
