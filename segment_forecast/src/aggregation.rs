//! Grouping of observations into per-segment daily series

use crate::data::{Dataset, Metric, MetricValues, Observation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Segment label used for the series built from every row
pub const ALL_SEGMENTS: &str = "all";

/// Metrics of one day, summed over every observation of that day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub values: MetricValues,
    #[serde(default)]
    pub extras: BTreeMap<String, f64>,
}

impl DailyPoint {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            values: MetricValues::default(),
            extras: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, obs: &Observation) {
        self.values = self.values.add(&obs.values);
        for (column, value) in &obs.extras {
            *self.extras.entry(column.clone()).or_insert(0.0) += value;
        }
    }

    /// Value of a named numeric column: a raw metric or an extra column
    pub fn column_value(&self, column: &str) -> f64 {
        match column.parse::<Metric>() {
            Ok(metric) => self.values.get(metric),
            Err(_) => self.extras.get(column).copied().unwrap_or(0.0),
        }
    }
}

/// Daily series of one segment value along one dimension, dates ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSeries {
    pub dimension: String,
    pub segment_value: String,
    points: Vec<DailyPoint>,
}

impl SegmentSeries {
    /// Fold observations into a date-sorted series
    pub fn from_observations<'a>(
        dimension: &str,
        segment_value: &str,
        observations: impl IntoIterator<Item = &'a Observation>,
    ) -> Self {
        let by_date = observations.into_iter().fold(
            BTreeMap::<NaiveDate, DailyPoint>::new(),
            |mut acc, obs| {
                acc.entry(obs.date)
                    .or_insert_with(|| DailyPoint::empty(obs.date))
                    .absorb(obs);
                acc
            },
        );

        Self {
            dimension: dimension.to_string(),
            segment_value: segment_value.to_string(),
            points: by_date.into_values().collect(),
        }
    }

    /// Daily points, oldest first
    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    /// Number of distinct observation days
    pub fn days(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Calendar days covered from first to last observation, inclusive
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days() + 1,
            _ => 0,
        }
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Daily values of one metric
    pub fn metric_values(&self, metric: Metric) -> Vec<f64> {
        self.points.iter().map(|p| p.values.get(metric)).collect()
    }

    /// Daily values of a named column (metric or extra)
    pub fn column_values(&self, column: &str) -> Vec<f64> {
        self.points.iter().map(|p| p.column_value(column)).collect()
    }

    /// Metric totals over the whole series
    pub fn totals(&self) -> MetricValues {
        self.points
            .iter()
            .fold(MetricValues::default(), |acc, p| acc.add(&p.values))
    }

    /// Total of a named column over the whole series
    pub fn column_total(&self, column: &str) -> f64 {
        self.points.iter().map(|p| p.column_value(column)).sum()
    }
}

/// Build one series per distinct assigned value of `dimension`.
///
/// Rows whose value is missing or matches `is_unassigned` are left out of
/// segment series; they still count in [`global_series`].
pub fn aggregate_by_dimension(
    dataset: &Dataset,
    dimension: &str,
    is_unassigned: impl Fn(&str) -> bool,
) -> BTreeMap<String, SegmentSeries> {
    let mut groups: BTreeMap<String, Vec<&Observation>> = BTreeMap::new();
    for obs in dataset.observations() {
        let Some(value) = obs.segment(dimension) else {
            continue;
        };
        let value = value.trim();
        if is_unassigned(value) {
            continue;
        }
        groups.entry(value.to_string()).or_default().push(obs);
    }

    groups
        .into_iter()
        .map(|(value, rows)| {
            let series = SegmentSeries::from_observations(dimension, &value, rows);
            (value, series)
        })
        .collect()
}

/// A single unsegmented series over every observation
pub fn global_series(dataset: &Dataset) -> SegmentSeries {
    SegmentSeries::from_observations(ALL_SEGMENTS, ALL_SEGMENTS, dataset.observations())
}
