//! Insight engine: the entry point of an analysis run
//!
//! Frames every window of the configured catalog, then runs trend, outlier,
//! significance and clustering analysis on the full window and derives alerts.

use crate::alerts::{anomaly_alerts, churn_alerts, roas_alerts, sort_by_severity, Alert};
use crate::anomaly::{strongest, Outlier, OutlierScanner};
use crate::clustering::{ClusterResult, SegmentClusterer};
use crate::error::{InsightError, Result};
use crate::report::{InsightReport, RunSummary};
use crate::significance::{PairwiseResult, SignificanceTester};
use crate::trends::{TrendDetector, TrendSignal, TrendSignals};
use rayon::prelude::*;
use segment_forecast::{Dataset, EngineConfig, PeriodFramer, PeriodResult, FULL_PERIOD};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Full-window analysis of one dimension
#[derive(Debug, Clone)]
struct DimensionAnalysis {
    dimension: String,
    signals: Vec<TrendSignal>,
    outliers: Vec<Outlier>,
    anomalies: Vec<Outlier>,
    significance: Vec<PairwiseResult>,
    clusters: ClusterResult,
    low_roas: Vec<Alert>,
}

/// Runs the whole pipeline for one configuration
#[derive(Debug, Clone)]
pub struct InsightEngine {
    config: EngineConfig,
}

impl InsightEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyse `dataset` and build the report
    pub fn run(&self, dataset: &Dataset) -> Result<InsightReport> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(InsightError::InsufficientData(
                "dataset has no observations".to_string(),
            ));
        }

        let windows = self.config.windows();
        info!(
            observations = dataset.len(),
            dimensions = self.config.dimensions.len(),
            periods = windows.len(),
            "starting insight run"
        );

        let framer = PeriodFramer::new(&self.config)?;
        let by_period = framer.frame_all(dataset);
        let full = by_period.get(FULL_PERIOD).ok_or_else(|| {
            InsightError::InsufficientData(format!("no {} window was framed", FULL_PERIOD))
        })?;

        let analyses = self
            .config
            .dimensions
            .par_iter()
            .map(|dimension| self.analyse_dimension(dimension, full))
            .collect::<Result<Vec<_>>>()?;

        let mut trend_signals = TrendSignals::default();
        trend_signals.extend(self.stage_signals(full));

        let mut outliers = Vec::new();
        let mut anomalies = Vec::new();
        let mut low_roas = Vec::new();
        let mut significance = BTreeMap::new();
        let mut clusters = BTreeMap::new();
        for analysis in analyses {
            trend_signals.extend(analysis.signals);
            outliers.extend(analysis.outliers);
            anomalies.extend(analysis.anomalies);
            low_roas.extend(analysis.low_roas);
            significance.insert(analysis.dimension.clone(), analysis.significance);
            clusters.insert(analysis.dimension, analysis.clusters);
        }

        let policy = &self.config.outliers;
        let outliers = strongest(outliers, policy.statistics_top);
        let anomalies = strongest(anomalies, policy.grading_top);

        let mut alerts = anomaly_alerts(&anomalies, policy);
        alerts.extend(churn_alerts(trend_signals.iter()));
        alerts.extend(low_roas);
        sort_by_severity(&mut alerts);

        let diagnostics = by_period
            .values()
            .flat_map(|period| period.diagnostics.iter().cloned())
            .collect::<Vec<_>>();

        info!(
            periods = by_period.len(),
            trend_signals = trend_signals.len(),
            outliers = outliers.len(),
            alerts = alerts.len(),
            diagnostics = diagnostics.len(),
            "insight run finished"
        );

        Ok(InsightReport {
            summary: RunSummary {
                observations: dataset.len(),
                start_date: dataset.min_date(),
                end_date: dataset.max_date(),
                horizon: self.config.horizon,
                dimensions: self.config.dimensions.clone(),
                periods: windows.into_iter().map(|w| w.key).collect(),
            },
            by_period,
            trend_signals,
            outliers,
            alerts,
            significance,
            clusters,
            diagnostics,
        })
    }

    /// Trend signals of every funnel stage over the unsegmented series
    fn stage_signals(&self, full: &PeriodResult) -> Vec<TrendSignal> {
        let detector = TrendDetector::new(&self.config.trend);
        let dates = full.global.dates();
        self.config
            .funnel_stages
            .iter()
            .flat_map(|stage| {
                detector.detect(
                    stage,
                    None,
                    stage,
                    &dates,
                    &full.global.column_values(stage),
                )
            })
            .collect()
    }

    fn analyse_dimension(&self, dimension: &str, full: &PeriodResult) -> Result<DimensionAnalysis> {
        let empty = BTreeMap::new();
        let segments = full.dimension_series(dimension).unwrap_or(&empty);
        debug!(%dimension, segments = segments.len(), "analysing dimension");

        let detector = TrendDetector::new(&self.config.trend);
        let signals = segments
            .iter()
            .flat_map(|(name, series)| {
                let dates = series.dates();
                self.config.trend.metrics.iter().flat_map(move |&metric| {
                    detector.detect(
                        name,
                        Some(dimension),
                        metric.as_str(),
                        &dates,
                        &series.metric_values(metric),
                    )
                })
            })
            .collect();

        let scanner = OutlierScanner::new(&self.config.outliers);
        let outliers = segments.values().flat_map(|s| scanner.statistics(s)).collect();
        let anomalies = segments.values().flat_map(|s| scanner.grading(s)).collect();

        let stages = &self.config.funnel_stages;
        let (entry_stage, purchase_stage) = match (stages.first(), stages.last()) {
            (Some(entry), Some(purchase)) => (entry.as_str(), purchase.as_str()),
            _ => {
                return Err(InsightError::InsufficientData(
                    "no funnel stages configured".to_string(),
                ))
            }
        };
        let significance = SignificanceTester::new(&self.config.significance).test_dimension(
            dimension,
            segments,
            entry_stage,
            purchase_stage,
        );

        let clusters = SegmentClusterer::new(&self.config.clustering, stages).cluster(segments)?;

        let low_roas = full
            .segments
            .get(dimension)
            .map(|forecasts| roas_alerts(dimension, forecasts, &self.config.alerts))
            .unwrap_or_default();

        Ok(DimensionAnalysis {
            dimension: dimension.to_string(),
            signals,
            outliers,
            anomalies,
            significance,
            clusters,
            low_roas,
        })
    }
}
