//! Additive trend + seasonality regression
//!
//! Fits `y = a + b*t + weekly(t) [+ yearly(t)]` by ordinary least squares,
//! where the seasonal terms are Fourier series with periods of 7 and 365.25
//! days. Prediction intervals use Student's t with the residual scale of the
//! fit.
//!
//! Series with date gaps only pin down part of each seasonal cycle. A
//! component keeps the Fourier orders its observed phases can identify, and
//! weekly terms are dropped when the horizon reaches weekdays the history
//! never saw. Fits whose forecast leaves the plausible range of the history
//! are rejected so the caller can fall back to a simpler model.

use crate::error::{ForecastError, Result};
use crate::models::ForecastPoint;
use chrono::NaiveDate;
use linregress::{FormulaRegressionBuilder, RegressionDataBuilder};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use tracing::debug;

const WEEKLY_PERIOD: f64 = 7.0;
const WEEKLY_ORDER: usize = 3;
const YEARLY_PERIOD: f64 = 365.25;
const YEARLY_ORDER: usize = 5;

/// Forecasts may leave the history range by this multiple of its width
const RANGE_TOLERANCE: f64 = 2.0;

/// Regressor columns for one seasonal component
#[derive(Debug, Clone, Copy)]
struct Seasonality {
    name: &'static str,
    period: f64,
    order: usize,
    /// Every forecast phase must have been observed
    whole_cycle: bool,
}

impl Seasonality {
    /// Phase of day `t`, bucketed to whole days
    fn phase(&self, t: f64) -> i64 {
        t.rem_euclid(self.period).floor() as i64
    }

    /// Copy of this component limited to the orders `history` identifies;
    /// `None` when no order is identifiable
    fn identifiable(&self, history: &[f64], future: &[f64]) -> Option<Self> {
        let observed: BTreeSet<i64> = history.iter().map(|&t| self.phase(t)).collect();
        if self.whole_cycle && future.iter().any(|&t| !observed.contains(&self.phase(t))) {
            return None;
        }
        // 2 * order + 1 distinct phases per order
        let order = self.order.min(observed.len().saturating_sub(1) / 2);
        (order > 0).then_some(Self { order, ..*self })
    }

    fn columns(&self) -> Vec<String> {
        (1..=self.order)
            .flat_map(|k| {
                [
                    format!("{}_sin{}", self.name, k),
                    format!("{}_cos{}", self.name, k),
                ]
            })
            .collect()
    }

    fn features(&self, t: f64) -> Vec<f64> {
        (1..=self.order)
            .flat_map(|k| {
                let angle = 2.0 * PI * k as f64 * t / self.period;
                [angle.sin(), angle.cos()]
            })
            .collect()
    }
}

/// Fit the model on `(dates, values)` and forecast each of `future`
pub fn forecast(
    dates: &[NaiveDate],
    values: &[f64],
    future: &[NaiveDate],
    interval_width: f64,
    yearly: bool,
) -> Result<Vec<ForecastPoint>> {
    let origin = *dates
        .first()
        .ok_or_else(|| ForecastError::InsufficientData("seasonal model needs data".to_string()))?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::ModelFit(
            "seasonal model input contains non-finite values".to_string(),
        ));
    }

    let elapsed = |date: &NaiveDate| (*date - origin).num_days() as f64;
    let history_t: Vec<f64> = dates.iter().map(&elapsed).collect();
    let future_t: Vec<f64> = future.iter().map(&elapsed).collect();

    let mut candidates = vec![Seasonality {
        name: "weekly",
        period: WEEKLY_PERIOD,
        order: WEEKLY_ORDER,
        whole_cycle: true,
    }];
    if yearly {
        candidates.push(Seasonality {
            name: "yearly",
            period: YEARLY_PERIOD,
            order: YEARLY_ORDER,
            whole_cycle: false,
        });
    }
    let components: Vec<Seasonality> = candidates
        .iter()
        .filter_map(|c| c.identifiable(&history_t, &future_t))
        .collect();
    let full_orders: usize = candidates.iter().map(|c| c.order).sum();
    if components.iter().map(|c| c.order).sum::<usize>() < full_orders {
        debug!(
            kept = ?components.iter().map(|c| (c.name, c.order)).collect::<Vec<_>>(),
            "seasonal orders reduced for sparse phases"
        );
    }
    let regressors: Vec<String> = std::iter::once("trend".to_string())
        .chain(components.iter().flat_map(Seasonality::columns))
        .collect();
    let n = values.len();
    // intercept plus every regressor, and at least one residual degree of freedom
    let parameters = regressors.len() + 1;
    if n <= parameters {
        return Err(ForecastError::ModelFit(format!(
            "seasonal model needs more than {} points, have {}",
            parameters, n
        )));
    }

    let design = |date: &NaiveDate| -> Vec<f64> {
        let t = elapsed(date);
        std::iter::once(t)
            .chain(components.iter().flat_map(|c| c.features(t)))
            .collect()
    };

    let rows: Vec<Vec<f64>> = dates.iter().map(&design).collect();
    let mut columns: Vec<(String, Vec<f64>)> = vec![("y".to_string(), values.to_vec())];
    for (j, name) in regressors.iter().enumerate() {
        columns.push((name.clone(), rows.iter().map(|row| row[j]).collect()));
    }

    let data = RegressionDataBuilder::new()
        .build_from(columns)
        .map_err(|e| ForecastError::ModelFit(format!("regression data: {}", e)))?;
    let formula = format!("y ~ {}", regressors.join(" + "));
    let model = FormulaRegressionBuilder::new()
        .data(&data)
        .formula(formula)
        .fit()
        .map_err(|e| ForecastError::ModelFit(format!("seasonal regression: {}", e)))?;

    // intercept first, then regressors in formula order
    let params = model.parameters();
    if params.len() != parameters || params.iter().any(|p| !p.is_finite()) {
        return Err(ForecastError::ModelFit(
            "seasonal regression produced unusable coefficients".to_string(),
        ));
    }

    let residual_se = model.scale().max(0.0).sqrt();
    let df = (n - parameters) as f64;
    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| ForecastError::ModelFit(format!("t-distribution: {}", e)))?;
    let multiplier = t_dist.inverse_cdf(0.5 + interval_width / 2.0);

    let (low, high) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let margin = (RANGE_TOLERANCE * (high - low)).max(1e-6 * (1.0 + high.abs()));

    future
        .iter()
        .enumerate()
        .map(|(step, date)| {
            let x = design(date);
            let estimate = params[0]
                + params[1..]
                    .iter()
                    .zip(&x)
                    .map(|(beta, value)| beta * value)
                    .sum::<f64>();
            // widen slowly with the distance from the fitted range
            let width = multiplier * residual_se * (1.0 + (step + 1) as f64 / n as f64).sqrt();
            if !estimate.is_finite() || !width.is_finite() {
                return Err(ForecastError::ModelFit(
                    "seasonal forecast produced non-finite values".to_string(),
                ));
            }
            if estimate > high + margin || estimate < low - margin {
                return Err(ForecastError::ModelFit(format!(
                    "seasonal forecast {:.2} on {} is outside the history range {:.2}..{:.2}",
                    estimate, date, low, high
                )));
            }
            Ok(ForecastPoint::clamped(
                *date,
                estimate,
                estimate - width,
                estimate + width,
            ))
        })
        .collect()
}
