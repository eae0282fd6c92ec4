//! Actionable alerts derived from the full-window analysis

use crate::anomaly::Outlier;
use crate::trends::{Direction, Severity, TrendSignal};
use segment_forecast::config::{AlertPolicy, OutlierPolicy};
use segment_forecast::SegmentForecast;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Anomaly,
    ChurnRisk,
    LowRoas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub dimension: Option<String>,
    pub subject: String,
    pub metric: String,
    pub value: f64,
    pub message: String,
}

/// One alert per graded outlier; high severity once the statistics
/// threshold is also crossed
pub fn anomaly_alerts(outliers: &[Outlier], policy: &OutlierPolicy) -> Vec<Alert> {
    outliers
        .iter()
        .map(|o| Alert {
            kind: AlertKind::Anomaly,
            severity: if o.z_score > policy.statistics_z {
                Severity::High
            } else {
                Severity::Medium
            },
            dimension: Some(o.dimension.clone()),
            subject: o.segment.clone(),
            metric: o.metric.to_string(),
            value: o.value,
            message: format!(
                "{} {} on {} was {:.2} (z-score {:.2})",
                o.segment, o.metric, o.date, o.value, o.z_score
            ),
        })
        .collect()
}

/// One alert per high-severity churn signal
pub fn churn_alerts<'a>(signals: impl IntoIterator<Item = &'a TrendSignal>) -> Vec<Alert> {
    signals
        .into_iter()
        .filter(|s| s.direction == Direction::ChurnRisk && s.severity == Severity::High)
        .map(|s| Alert {
            kind: AlertKind::ChurnRisk,
            severity: Severity::High,
            dimension: s.dimension.clone(),
            subject: s.subject.clone(),
            metric: s.metric.clone(),
            value: s.change_pct,
            message: format!(
                "{} {} fell {:.1}% over the last {} ({:.2} vs {:.2})",
                s.subject,
                s.metric,
                s.change_pct.abs(),
                s.period,
                s.recent_mean,
                s.previous_mean
            ),
        })
        .collect()
}

/// Segments with spend whose ROAS is below the policy minimum. Below half
/// the minimum is high severity.
pub fn roas_alerts(
    dimension: &str,
    segments: &BTreeMap<String, SegmentForecast>,
    policy: &AlertPolicy,
) -> Vec<Alert> {
    segments
        .iter()
        .filter(|(_, s)| s.actuals.cost > 0.0 && s.ratios.roas < policy.min_roas)
        .map(|(name, s)| Alert {
            kind: AlertKind::LowRoas,
            severity: if s.ratios.roas < policy.min_roas / 2.0 {
                Severity::High
            } else {
                Severity::Medium
            },
            dimension: Some(dimension.to_string()),
            subject: name.clone(),
            metric: "roas".to_string(),
            value: s.ratios.roas,
            message: format!(
                "{} ROAS is {:.1}% on {:.2} spend, below {:.1}%",
                name, s.ratios.roas, s.actuals.cost, policy.min_roas
            ),
        })
        .collect()
}

/// Most severe first; ties keep their input order
pub fn sort_by_severity(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use segment_forecast::Metric;

    fn outlier(z_score: f64) -> Outlier {
        Outlier {
            dimension: "channel".to_string(),
            segment: "Search".to_string(),
            metric: Metric::Cost,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            value: 900.0,
            z_score,
        }
    }

    fn signal(direction: Direction, severity: Severity) -> TrendSignal {
        TrendSignal {
            subject: "Search".to_string(),
            dimension: Some("channel".to_string()),
            metric: "revenue".to_string(),
            period: "7d".to_string(),
            direction,
            change_pct: -45.0,
            severity,
            recent_mean: 55.0,
            previous_mean: 100.0,
        }
    }

    #[test]
    fn test_anomaly_severity() {
        let policy = OutlierPolicy::default();
        let alerts = anomaly_alerts(&[outlier(2.7), outlier(3.4)], &policy);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(alerts[1].severity, Severity::High);
        assert!(alerts[0].message.contains("2024-02-01"));
    }

    #[test]
    fn test_only_high_churn_alerts() {
        let signals = vec![
            signal(Direction::ChurnRisk, Severity::High),
            signal(Direction::ChurnRisk, Severity::Medium),
            signal(Direction::Improvement, Severity::High),
        ];
        let alerts = churn_alerts(&signals);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::ChurnRisk);
        assert!(alerts[0].message.contains("fell 45.0%"));
    }

    #[test]
    fn test_sort_by_severity_is_stable() {
        let policy = OutlierPolicy::default();
        let mut alerts = anomaly_alerts(&[outlier(2.6), outlier(3.5), outlier(2.8)], &policy);
        sort_by_severity(&mut alerts);
        assert_eq!(alerts[0].severity, Severity::High);
        assert!(alerts[1].message.ends_with("(z-score 2.60)"));
        assert!(alerts[2].message.ends_with("(z-score 2.80)"));
    }
}
