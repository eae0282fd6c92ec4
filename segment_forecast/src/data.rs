//! Normalized marketing observations and input loading

use crate::config::EngineConfig;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use tracing::debug;

/// Date formats accepted in the `date` column, tried in order
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Raw performance metric carried by every observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cost,
    Impressions,
    Clicks,
    Conversions,
    Revenue,
}

impl Metric {
    /// All metrics in canonical order
    pub const ALL: [Metric; 5] = [
        Metric::Cost,
        Metric::Impressions,
        Metric::Clicks,
        Metric::Conversions,
        Metric::Revenue,
    ];

    /// Column name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cost => "cost",
            Metric::Impressions => "impressions",
            Metric::Clicks => "clicks",
            Metric::Conversions => "conversions",
            Metric::Revenue => "revenue",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == lowered)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("Unknown metric: {}", s)))
    }
}

/// One value per raw metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub cost: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub revenue: f64,
}

impl MetricValues {
    /// Create a set of metric values
    pub fn new(cost: f64, impressions: f64, clicks: f64, conversions: f64, revenue: f64) -> Self {
        Self {
            cost,
            impressions,
            clicks,
            conversions,
            revenue,
        }
    }

    /// Build from a per-metric function
    pub fn from_fn(mut f: impl FnMut(Metric) -> f64) -> Self {
        Self {
            cost: f(Metric::Cost),
            impressions: f(Metric::Impressions),
            clicks: f(Metric::Clicks),
            conversions: f(Metric::Conversions),
            revenue: f(Metric::Revenue),
        }
    }

    /// Value of a single metric
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cost => self.cost,
            Metric::Impressions => self.impressions,
            Metric::Clicks => self.clicks,
            Metric::Conversions => self.conversions,
            Metric::Revenue => self.revenue,
        }
    }

    /// Element-wise sum
    pub fn add(&self, other: &MetricValues) -> MetricValues {
        MetricValues::from_fn(|m| self.get(m) + other.get(m))
    }

    /// Replace NaN and infinite values by zero
    pub fn cleaned(&self) -> MetricValues {
        MetricValues::from_fn(|m| clean_number(self.get(m)))
    }
}

/// A single daily observation for one combination of segment values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// Dimension name to segment value, e.g. `channel -> "Search"`
    pub segments: BTreeMap<String, String>,
    pub values: MetricValues,
    /// Additional numeric columns, used for funnel stages that are not raw metrics
    #[serde(default)]
    pub extras: BTreeMap<String, f64>,
}

impl Observation {
    /// Create an observation without segment values
    pub fn new(date: NaiveDate, values: MetricValues) -> Self {
        Self {
            date,
            segments: BTreeMap::new(),
            values,
            extras: BTreeMap::new(),
        }
    }

    /// Attach a segment value for `dimension`
    pub fn with_segment(mut self, dimension: &str, value: &str) -> Self {
        self.segments
            .insert(dimension.to_string(), value.to_string());
        self
    }

    /// Attach an extra numeric column
    pub fn with_extra(mut self, column: &str, value: f64) -> Self {
        self.extras.insert(column.to_string(), value);
        self
    }

    /// Segment value along `dimension`, if any
    pub fn segment(&self, dimension: &str) -> Option<&str> {
        self.segments.get(dimension).map(String::as_str)
    }

    /// Value of a named numeric column: a raw metric or an extra column
    pub fn column_value(&self, column: &str) -> f64 {
        match column.parse::<Metric>() {
            Ok(metric) => self.values.get(metric),
            Err(_) => self.extras.get(column).copied().unwrap_or(0.0),
        }
    }
}

/// The normalized tabular input of one analysis run
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    /// Create a dataset, coercing non-finite numbers to zero
    pub fn new(observations: Vec<Observation>) -> Self {
        let observations = observations
            .into_iter()
            .map(|mut obs| {
                obs.values = obs.values.cleaned();
                for value in obs.extras.values_mut() {
                    *value = clean_number(*value);
                }
                obs
            })
            .collect();
        Self { observations }
    }

    /// Read a normalized table in CSV form.
    ///
    /// Requires a `date` column, one column per configured dimension, the five
    /// raw metrics and any funnel stage column that is not a raw metric.
    pub fn from_csv_reader<R: Read>(reader: R, config: &EngineConfig) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let find = |name: &str| -> Result<usize> {
            let wanted = name.trim().to_lowercase();
            headers
                .iter()
                .position(|h| *h == wanted)
                .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
        };

        let date_idx = find("date")?;
        let dimension_idx = config
            .dimensions
            .iter()
            .map(|d| Ok((d.clone(), find(d)?)))
            .collect::<Result<Vec<_>>>()?;
        let metric_idx = Metric::ALL
            .iter()
            .map(|m| Ok((*m, find(m.as_str())?)))
            .collect::<Result<Vec<_>>>()?;
        let extra_idx = config
            .funnel_stages
            .iter()
            .filter(|s| s.parse::<Metric>().is_err())
            .map(|s| Ok((s.clone(), find(s)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut observations = Vec::new();
        let mut dropped = 0usize;
        for record in rdr.records() {
            let record = record?;
            let cell = |idx: usize| record.get(idx).unwrap_or("");

            let Some(date) = parse_date(cell(date_idx)) else {
                dropped += 1;
                continue;
            };

            let mut values = MetricValues::default();
            for (metric, idx) in &metric_idx {
                let parsed = parse_number(cell(*idx));
                match metric {
                    Metric::Cost => values.cost = parsed,
                    Metric::Impressions => values.impressions = parsed,
                    Metric::Clicks => values.clicks = parsed,
                    Metric::Conversions => values.conversions = parsed,
                    Metric::Revenue => values.revenue = parsed,
                }
            }

            let mut obs = Observation::new(date, values);
            for (dimension, idx) in &dimension_idx {
                obs = obs.with_segment(dimension, cell(*idx));
            }
            for (column, idx) in &extra_idx {
                obs = obs.with_extra(column, parse_number(cell(*idx)));
            }
            observations.push(obs);
        }

        if dropped > 0 {
            debug!(dropped, "dropped rows with unparsable dates");
        }

        Ok(Self::new(observations))
    }

    /// All observations in input order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the dataset has no observations
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Latest observation date
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.observations.iter().map(|o| o.date).max()
    }

    /// Earliest observation date
    pub fn min_date(&self) -> Option<NaiveDate> {
        self.observations.iter().map(|o| o.date).min()
    }

    /// Observations from the last `lookback_days` calendar days, ending at the
    /// dataset maximum date. `0` keeps everything.
    pub fn trailing(&self, lookback_days: u32) -> Dataset {
        let Some(max_date) = self.max_date() else {
            return self.clone();
        };
        if lookback_days == 0 {
            return self.clone();
        }

        let cutoff = max_date - Duration::days(i64::from(lookback_days));
        Dataset {
            observations: self
                .observations
                .iter()
                .filter(|o| o.date > cutoff)
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<Observation> for Dataset {
    fn from_iter<T: IntoIterator<Item = Observation>>(iter: T) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

/// Parse a calendar date in any of the accepted formats
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Timestamps keep only their date part
    let raw = raw.split(['T', ' ']).next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Coerce a numeric cell, treating anything unparsable as zero
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();
    cleaned.parse::<f64>().map(clean_number).unwrap_or(0.0)
}

fn clean_number(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
