//! Pairwise conversion significance between segments of one dimension
//!
//! Each pair is tested on the table
//!
//! ```text
//!             converted   not converted
//! segment a   purchases   entries - purchases
//! segment b   purchases   entries - purchases
//! ```
//!
//! where entries is the first funnel stage total and purchases the last.

use insight_math::{ChiSquareTest, ContingencyTable};
use segment_forecast::aggregation::SegmentSeries;
use segment_forecast::config::SignificancePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Funnel totals of one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunnelTotals {
    pub entries: f64,
    pub purchases: f64,
}

impl FunnelTotals {
    pub fn from_series(series: &SegmentSeries, entry_stage: &str, purchase_stage: &str) -> Self {
        Self {
            entries: series.column_total(entry_stage),
            purchases: series.column_total(purchase_stage),
        }
    }
}

/// Chi-square outcome for one unordered segment pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseResult {
    pub dimension: String,
    pub segment_a: String,
    pub segment_b: String,
    pub totals_a: FunnelTotals,
    pub totals_b: FunnelTotals,
    pub statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Runs the pairwise tests for one dimension
#[derive(Debug, Clone)]
pub struct SignificanceTester<'a> {
    policy: &'a SignificancePolicy,
    test: ChiSquareTest,
}

impl<'a> SignificanceTester<'a> {
    pub fn new(policy: &'a SignificancePolicy) -> Self {
        Self {
            policy,
            test: ChiSquareTest::new(policy.yates_correction),
        }
    }

    /// Test one pair. `None` when any cell is at or below the minimum count.
    pub fn test_pair(
        &self,
        dimension: &str,
        (segment_a, totals_a): (&str, FunnelTotals),
        (segment_b, totals_b): (&str, FunnelTotals),
    ) -> Option<PairwiseResult> {
        let table = ContingencyTable::from_conversions(
            totals_a.entries,
            totals_a.purchases,
            totals_b.entries,
            totals_b.purchases,
        );
        if !table.all_cells_exceed(self.policy.min_cell) {
            debug!(%dimension, %segment_a, %segment_b, "pair skipped, sparse contingency cells");
            return None;
        }

        match self.test.test(&table) {
            Ok(outcome) => Some(PairwiseResult {
                dimension: dimension.to_string(),
                segment_a: segment_a.to_string(),
                segment_b: segment_b.to_string(),
                totals_a,
                totals_b,
                statistic: outcome.statistic,
                p_value: outcome.p_value,
                significant: outcome.p_value < self.policy.alpha,
            }),
            Err(err) => {
                debug!(%dimension, %segment_a, %segment_b, error = %err, "pair skipped");
                None
            }
        }
    }

    /// Test every unordered pair of segments, in segment order
    pub fn test_dimension(
        &self,
        dimension: &str,
        segments: &BTreeMap<String, SegmentSeries>,
        entry_stage: &str,
        purchase_stage: &str,
    ) -> Vec<PairwiseResult> {
        let totals: Vec<(&str, FunnelTotals)> = segments
            .iter()
            .map(|(name, series)| {
                (
                    name.as_str(),
                    FunnelTotals::from_series(series, entry_stage, purchase_stage),
                )
            })
            .collect();

        let mut results = Vec::new();
        for (i, &a) in totals.iter().enumerate() {
            for &b in &totals[i + 1..] {
                if let Some(result) = self.test_pair(dimension, a, b) {
                    results.push(result);
                }
            }
        }
        results
    }
}
