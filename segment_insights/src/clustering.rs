//! Performance-tier clustering of segments
//!
//! Each segment is described by its funnel profile over the full window:
//! every later stage relative to the entry stage, the conversion rate, and
//! revenue per entry. Features are standardized and partitioned with seeded
//! k-means; occupied clusters are renumbered densely so that cluster `0` has
//! the highest conversion-rate centroid.

use crate::error::Result;
use insight_math::{standardize_columns, KMeans};
use segment_forecast::aggregation::SegmentSeries;
use segment_forecast::config::ClusteringPolicy;
use segment_forecast::Ratios;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// One cluster and its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterTier {
    pub cluster: usize,
    pub label: String,
    pub members: Vec<String>,
}

/// Partition of one dimension's segments; empty when clustering was skipped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterResult {
    pub n_clusters: usize,
    /// segment value → cluster id
    pub assignments: BTreeMap<String, usize>,
    pub tiers: Vec<ClusterTier>,
    /// Feature names, in feature-vector order
    pub features: Vec<String>,
}

impl ClusterResult {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Groups of segments sharing a cluster, independent of cluster numbering
    pub fn partition(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = self
            .tiers
            .iter()
            .map(|tier| {
                let mut members = tier.members.clone();
                members.sort();
                members
            })
            .collect();
        groups.sort();
        groups
    }
}

/// Names of the features built from `stages`
pub fn feature_names(stages: &[String]) -> Vec<String> {
    let Some((entry, later)) = stages.split_first() else {
        return Vec::new();
    };
    later
        .iter()
        .map(|stage| format!("{}/{}", stage, entry))
        .chain(["cvr".to_string(), format!("revenue/{}", entry)])
        .collect()
}

/// Feature vector of one segment; `None` when the entry stage total is not positive
pub fn feature_vector(series: &SegmentSeries, stages: &[String]) -> Option<Vec<f64>> {
    let (entry_stage, later) = stages.split_first()?;
    let entries = series.column_total(entry_stage);
    if !(entries > 0.0) {
        return None;
    }

    let totals = series.totals();
    let features: Vec<f64> = later
        .iter()
        .map(|stage| series.column_total(stage) / entries)
        .chain([
            Ratios::from_values(&totals).cvr / 100.0,
            totals.revenue / entries,
        ])
        .collect();
    features.iter().all(|f| f.is_finite()).then_some(features)
}

/// Tier label of the cluster ranked `rank` (0 = strongest) out of `k`
pub fn tier_label(rank: usize, k: usize) -> String {
    match (k, rank) {
        (1, 0) | (2, 0) | (3, 0) => "high".to_string(),
        (2, 1) | (3, 2) => "low".to_string(),
        (3, 1) => "mid".to_string(),
        _ => format!("tier-{}", rank + 1),
    }
}

/// Applies a [`ClusteringPolicy`] to the segments of one dimension
#[derive(Debug, Clone, Copy)]
pub struct SegmentClusterer<'a> {
    policy: &'a ClusteringPolicy,
    stages: &'a [String],
}

impl<'a> SegmentClusterer<'a> {
    pub fn new(policy: &'a ClusteringPolicy, stages: &'a [String]) -> Self {
        Self { policy, stages }
    }

    /// Cluster `segments`; too few segments with a usable profile give an
    /// empty result
    pub fn cluster(&self, segments: &BTreeMap<String, SegmentSeries>) -> Result<ClusterResult> {
        let (names, rows): (Vec<&String>, Vec<Vec<f64>>) = segments
            .iter()
            .filter_map(|(name, series)| Some((name, feature_vector(series, self.stages)?)))
            .unzip();

        if rows.len() < self.policy.min_segments.max(1) {
            debug!(
                valid = rows.len(),
                required = self.policy.min_segments,
                "clustering skipped"
            );
            return Ok(ClusterResult::default());
        }

        let scaled = standardize_columns(&rows)?;
        let k = self.policy.max_clusters.min(rows.len());
        let fit = KMeans::new(k, self.policy.max_iterations, self.policy.seed)?
            .with_restarts(self.policy.restarts)
            .fit(&scaled)?;

        // occupied clusters only, strongest conversion-rate centroid first
        let cvr_idx = self.stages.len() - 1;
        let mut order: Vec<usize> = (0..k).filter(|c| fit.assignments.contains(c)).collect();
        order.sort_by(|&a, &b| {
            fit.centroids[b][cvr_idx]
                .partial_cmp(&fit.centroids[a][cvr_idx])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        let occupied = order.len();
        if occupied < k {
            debug!(requested = k, occupied, "empty clusters dropped");
        }
        let mut rank = vec![0usize; k];
        for (new_id, &old_id) in order.iter().enumerate() {
            rank[old_id] = new_id;
        }

        let assignments: BTreeMap<String, usize> = names
            .iter()
            .zip(&fit.assignments)
            .map(|(name, &cluster)| ((*name).clone(), rank[cluster]))
            .collect();

        let tiers = (0..occupied)
            .map(|cluster| ClusterTier {
                cluster,
                label: tier_label(cluster, occupied),
                members: assignments
                    .iter()
                    .filter(|(_, c)| **c == cluster)
                    .map(|(name, _)| name.clone())
                    .collect(),
            })
            .collect();

        Ok(ClusterResult {
            n_clusters: occupied,
            assignments,
            tiers,
            features: feature_names(self.stages),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use segment_forecast::{MetricValues, Observation};

    fn stages() -> Vec<String> {
        vec!["impressions".into(), "clicks".into(), "conversions".into()]
    }

    fn series(name: &str, impressions: f64, clicks: f64, conversions: f64, revenue: f64) -> SegmentSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<Observation> = (0..5)
            .map(|i| {
                Observation::new(
                    start + Duration::days(i),
                    MetricValues::new(10.0, impressions, clicks, conversions, revenue),
                )
            })
            .collect();
        SegmentSeries::from_observations("channel", name, &rows)
    }

    #[test]
    fn test_feature_vector() {
        let s = series("Search", 1000.0, 100.0, 10.0, 500.0);
        let features = feature_vector(&s, &stages()).unwrap();
        assert_eq!(features.len(), 4);
        assert!((features[0] - 0.1).abs() < 1e-12);
        assert!((features[1] - 0.01).abs() < 1e-12);
        assert!((features[2] - 0.1).abs() < 1e-12);
        assert!((features[3] - 0.5).abs() < 1e-12);
        assert_eq!(
            feature_names(&stages()),
            vec!["clicks/impressions", "conversions/impressions", "cvr", "revenue/impressions"]
        );
    }

    #[test]
    fn test_zero_entry_has_no_features() {
        let s = series("Dead", 0.0, 0.0, 0.0, 0.0);
        assert!(feature_vector(&s, &stages()).is_none());
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(tier_label(0, 3), "high");
        assert_eq!(tier_label(1, 3), "mid");
        assert_eq!(tier_label(2, 3), "low");
        assert_eq!(tier_label(1, 2), "low");
        assert_eq!(tier_label(3, 5), "tier-4");
    }

    #[test]
    fn test_strongest_cluster_is_zero() {
        let mut segments = BTreeMap::new();
        for (name, conversions) in [("A", 30.0), ("B", 29.0), ("C", 10.0), ("D", 9.5), ("E", 1.0), ("F", 1.2)] {
            segments.insert(name.to_string(), series(name, 1000.0, 100.0, conversions, conversions * 20.0));
        }
        let policy = ClusteringPolicy::default();
        let stages = stages();
        let result = SegmentClusterer::new(&policy, &stages).cluster(&segments).unwrap();

        assert_eq!(result.n_clusters, 3);
        assert_eq!(result.assignments["A"], 0);
        assert_eq!(result.assignments["B"], 0);
        assert_eq!(result.assignments["C"], 1);
        assert_eq!(result.assignments["E"], 2);
        assert_eq!(result.tiers[0].label, "high");
        assert_eq!(result.tiers[2].members, vec!["E".to_string(), "F".to_string()]);
    }

    #[test]
    fn test_too_few_segments() {
        let mut segments = BTreeMap::new();
        segments.insert("A".to_string(), series("A", 1000.0, 100.0, 10.0, 100.0));
        segments.insert("B".to_string(), series("B", 1000.0, 50.0, 1.0, 10.0));
        segments.insert("C".to_string(), series("C", 0.0, 0.0, 0.0, 0.0));
        let policy = ClusteringPolicy::default();
        let stages = stages();
        let result = SegmentClusterer::new(&policy, &stages).cluster(&segments).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.n_clusters, 0);
    }

    #[test]
    fn test_identical_segments_share_one_tier() {
        let mut segments = BTreeMap::new();
        for name in ["A", "B", "C"] {
            segments.insert(name.to_string(), series(name, 1000.0, 100.0, 10.0, 200.0));
        }
        let policy = ClusteringPolicy::default();
        let stages = stages();
        let result = SegmentClusterer::new(&policy, &stages).cluster(&segments).unwrap();

        assert_eq!(result.n_clusters, 1);
        assert_eq!(result.tiers.len(), 1);
        assert_eq!(result.tiers[0].label, "high");
        assert_eq!(result.tiers[0].members, vec!["A", "B", "C"]);
        assert!(result.assignments.values().all(|&c| c == 0));
    }
}
