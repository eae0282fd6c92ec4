//! Period-over-period trend classification
//!
//! For every comparison span `s`, the mean of the observations in the last
//! `s` calendar days is compared with the mean of the `s` days before them.
//! A span is only evaluated when the series covers at least `2 * s` days and
//! both windows hold an observation, so gaps shrink a window instead of
//! stretching it.

use chrono::{Duration, NaiveDate};
use insight_math::mean;
use segment_forecast::config::TrendPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a metric moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ChurnRisk,
    Improvement,
}

/// Severity shared by trend signals and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

/// Means of two adjacent, equal-length spans
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanComparison {
    pub span: usize,
    pub recent_mean: f64,
    pub previous_mean: f64,
}

impl SpanComparison {
    /// Compare the last `span` days of sorted `(dates, values)` with the
    /// `span` days before them
    pub fn of(dates: &[NaiveDate], values: &[f64], span: usize) -> Option<Self> {
        if span == 0 || dates.len() != values.len() {
            return None;
        }
        let (first, last) = (*dates.first()?, *dates.last()?);
        let days = i64::try_from(span).ok()?;
        if (last - first).num_days() + 1 < 2 * days {
            return None;
        }

        let recent_after = last - Duration::days(days);
        let previous_after = last - Duration::days(2 * days);
        let (mut recent, mut previous) = (Vec::new(), Vec::new());
        for (date, &value) in dates.iter().zip(values) {
            if *date > recent_after {
                recent.push(value);
            } else if *date > previous_after {
                previous.push(value);
            }
        }

        Some(Self {
            span,
            recent_mean: mean(&recent).ok()?,
            previous_mean: mean(&previous).ok()?,
        })
    }

    pub fn change_pct(&self) -> Option<f64> {
        change_pct(self.recent_mean, self.previous_mean)
    }
}

/// Percent change from `previous` to `recent`; `None` when `previous <= 0`
pub fn change_pct(recent: f64, previous: f64) -> Option<f64> {
    if previous <= 0.0 || !previous.is_finite() || !recent.is_finite() {
        return None;
    }
    Some((recent - previous) / previous * 100.0)
}

/// Classify a percent change. Both thresholds are strict.
pub fn classify(change_pct: f64, policy: &TrendPolicy) -> Option<(Direction, Severity)> {
    if change_pct < -policy.change_threshold {
        let severity = if change_pct < -policy.high_severity_threshold {
            Severity::High
        } else {
            Severity::Medium
        };
        Some((Direction::ChurnRisk, severity))
    } else if change_pct > policy.change_threshold {
        let severity = if change_pct > policy.high_severity_threshold {
            Severity::High
        } else {
            Severity::Medium
        };
        Some((Direction::Improvement, severity))
    } else {
        None
    }
}

/// A classified period-over-period change of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    /// Segment value, or funnel stage name for global signals
    pub subject: String,
    /// Dimension of the segment; absent for global funnel stages
    pub dimension: Option<String>,
    pub metric: String,
    /// Comparison span, e.g. `7d`
    pub period: String,
    pub direction: Direction,
    pub change_pct: f64,
    pub severity: Severity,
    pub recent_mean: f64,
    pub previous_mean: f64,
}

/// Trend signals split by direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSignals {
    pub churn: Vec<TrendSignal>,
    pub improvement: Vec<TrendSignal>,
}

impl TrendSignals {
    pub fn push(&mut self, signal: TrendSignal) {
        match signal.direction {
            Direction::ChurnRisk => self.churn.push(signal),
            Direction::Improvement => self.improvement.push(signal),
        }
    }

    pub fn len(&self) -> usize {
        self.churn.len() + self.improvement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.churn.is_empty() && self.improvement.is_empty()
    }

    /// Every signal, churn first
    pub fn iter(&self) -> impl Iterator<Item = &TrendSignal> {
        self.churn.iter().chain(self.improvement.iter())
    }
}

impl Extend<TrendSignal> for TrendSignals {
    fn extend<T: IntoIterator<Item = TrendSignal>>(&mut self, iter: T) {
        for signal in iter {
            self.push(signal);
        }
    }
}

/// Applies a [`TrendPolicy`] to daily series
#[derive(Debug, Clone, Copy)]
pub struct TrendDetector<'a> {
    policy: &'a TrendPolicy,
}

impl<'a> TrendDetector<'a> {
    pub fn new(policy: &'a TrendPolicy) -> Self {
        Self { policy }
    }

    /// Signals for every configured span the series is long enough for
    pub fn detect(
        &self,
        subject: &str,
        dimension: Option<&str>,
        metric: &str,
        dates: &[NaiveDate],
        values: &[f64],
    ) -> Vec<TrendSignal> {
        self.policy
            .spans
            .iter()
            .filter_map(|&span| {
                let comparison = SpanComparison::of(dates, values, span)?;
                let change = comparison.change_pct()?;
                let (direction, severity) = classify(change, self.policy)?;
                Some(TrendSignal {
                    subject: subject.to_string(),
                    dimension: dimension.map(str::to_string),
                    metric: metric.to_string(),
                    period: format!("{}d", span),
                    direction,
                    change_pct: change,
                    severity,
                    recent_mean: comparison.recent_mean,
                    previous_mean: comparison.previous_mean,
                })
            })
            .collect()
    }
}
