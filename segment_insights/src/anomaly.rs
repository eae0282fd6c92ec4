//! Z-score outlier detection over daily segment series

use chrono::NaiveDate;
use insight_math::z_scores;
use segment_forecast::aggregation::SegmentSeries;
use segment_forecast::config::OutlierPolicy;
use segment_forecast::Metric;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// One day whose value sits far from the series mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub dimension: String,
    pub segment: String,
    pub metric: Metric,
    pub date: NaiveDate,
    pub value: f64,
    pub z_score: f64,
}

/// Points of `values` with an absolute z-score above `threshold`, as
/// `(index, z_score)` pairs ordered by descending value and capped at `top`.
///
/// Series with fewer than two points or no spread have no outliers.
pub fn flag_outliers(values: &[f64], threshold: f64, top: usize) -> Vec<(usize, f64)> {
    let scores = match z_scores(values) {
        Ok(scores) => scores,
        Err(err) => {
            debug!(error = %err, "outlier scan skipped");
            return Vec::new();
        }
    };

    let mut flagged: Vec<(usize, f64)> = scores
        .into_iter()
        .enumerate()
        .filter(|(_, z)| *z > threshold)
        .collect();
    flagged.sort_by(|a, b| {
        values[b.0]
            .partial_cmp(&values[a.0])
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    flagged.truncate(top);
    flagged
}

/// Keep the `top` outliers with the largest z-score across every series.
/// Equal scores keep their input order.
pub fn strongest(mut outliers: Vec<Outlier>, top: usize) -> Vec<Outlier> {
    outliers.sort_by(|a, b| b.z_score.partial_cmp(&a.z_score).unwrap_or(Ordering::Equal));
    outliers.truncate(top);
    outliers
}

/// Applies an [`OutlierPolicy`] to segment series.
///
/// Caps apply per segment and metric here; the report applies them again to
/// the merged list with [`strongest`].
#[derive(Debug, Clone, Copy)]
pub struct OutlierScanner<'a> {
    policy: &'a OutlierPolicy,
}

impl<'a> OutlierScanner<'a> {
    pub fn new(policy: &'a OutlierPolicy) -> Self {
        Self { policy }
    }

    /// Statistics path: strict threshold, longer list
    pub fn statistics(&self, series: &SegmentSeries) -> Vec<Outlier> {
        self.scan(series, self.policy.statistics_z, self.policy.statistics_top)
    }

    /// Grading path: looser threshold, short list feeding anomaly alerts
    pub fn grading(&self, series: &SegmentSeries) -> Vec<Outlier> {
        self.scan(series, self.policy.grading_z, self.policy.grading_top)
    }

    fn scan(&self, series: &SegmentSeries, threshold: f64, top: usize) -> Vec<Outlier> {
        let points = series.points();
        self.policy
            .metrics
            .iter()
            .flat_map(|&metric| {
                let values = series.metric_values(metric);
                flag_outliers(&values, threshold, top)
                    .into_iter()
                    .map(move |(idx, z_score)| Outlier {
                        dimension: series.dimension.clone(),
                        segment: series.segment_value.clone(),
                        metric,
                        date: points[idx].date,
                        value: values[idx],
                        z_score,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spiky() -> Vec<f64> {
        let mut values = vec![10.0; 30];
        values[3] = 100.0;
        values[20] = 80.0;
        values
    }

    #[test]
    fn test_flags_spikes_sorted_by_value() {
        let flagged = flag_outliers(&spiky(), 2.5, 10);
        let indexes: Vec<usize> = flagged.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![3, 20]);
        assert!(flagged.iter().all(|(_, z)| *z > 2.5));
    }

    #[test]
    fn test_top_cap() {
        let flagged = flag_outliers(&spiky(), 2.5, 1);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].0, 3);
    }

    #[test]
    fn test_flat_and_tiny_series_have_no_outliers() {
        assert!(flag_outliers(&[5.0; 10], 1.0, 10).is_empty());
        assert!(flag_outliers(&[5.0], 1.0, 10).is_empty());
        assert!(flag_outliers(&[], 1.0, 10).is_empty());
    }

    fn outlier(segment: &str, z_score: f64) -> Outlier {
        Outlier {
            dimension: "channel".to_string(),
            segment: segment.to_string(),
            metric: Metric::Cost,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            value: 100.0,
            z_score,
        }
    }

    #[test]
    fn test_strongest_caps_merged_list() {
        let merged = vec![
            outlier("A", 3.2),
            outlier("B", 4.5),
            outlier("C", 3.9),
            outlier("D", 4.5),
        ];
        let kept = strongest(merged, 3);
        let segments: Vec<&str> = kept.iter().map(|o| o.segment.as_str()).collect();
        assert_eq!(segments, vec!["B", "D", "C"]);
    }
}
