//! Flat-projection estimators: weighted moving average, simple moving
//! average and last observed value

use crate::error::{ForecastError, Result};
use crate::models::{normal_multiplier, ForecastPoint};
use chrono::NaiveDate;
use insight_math::statistics::sample_std_dev;
use insight_math::{LinearWeightedMovingAverage, SimpleMovingAverage};

/// Points averaged by the weighted moving average
pub const WEIGHTED_WINDOW: usize = 14;
/// Points averaged by the simple moving average
pub const SIMPLE_WINDOW: usize = 7;

/// Linearly weighted mean of the last 14 values, projected flat
pub fn weighted(values: &[f64], future: &[NaiveDate], interval_width: f64) -> Result<Vec<ForecastPoint>> {
    require(values, WEIGHTED_WINDOW, "weighted moving average")?;
    let lwma = LinearWeightedMovingAverage::from_series(WEIGHTED_WINDOW, values)?;
    flat(lwma.value()?, &lwma.window(), future, interval_width)
}

/// Mean of the last 7 values, projected flat
pub fn simple(values: &[f64], future: &[NaiveDate], interval_width: f64) -> Result<Vec<ForecastPoint>> {
    require(values, SIMPLE_WINDOW, "simple moving average")?;
    let sma = SimpleMovingAverage::from_series(SIMPLE_WINDOW, values)?;
    flat(sma.value()?, &sma.window(), future, interval_width)
}

/// Most recent value repeated; the interval uses the spread of the whole series
pub fn last_value(values: &[f64], future: &[NaiveDate], interval_width: f64) -> Result<Vec<ForecastPoint>> {
    let last = *values.last().ok_or_else(|| {
        ForecastError::InsufficientData("last value needs at least one point".to_string())
    })?;
    if !last.is_finite() {
        return Err(ForecastError::ModelFit(format!(
            "last observed value is not finite: {}",
            last
        )));
    }
    flat(last, values, future, interval_width)
}

fn require(values: &[f64], window: usize, name: &str) -> Result<()> {
    if values.len() < window {
        return Err(ForecastError::InsufficientData(format!(
            "{} needs {} points, have {}",
            name,
            window,
            values.len()
        )));
    }
    Ok(())
}

fn flat(
    estimate: f64,
    support: &[f64],
    future: &[NaiveDate],
    interval_width: f64,
) -> Result<Vec<ForecastPoint>> {
    let spread = sample_std_dev(support).unwrap_or(0.0);
    let margin = normal_multiplier(interval_width)? * spread;

    Ok(future
        .iter()
        .map(|&date| ForecastPoint::clamped(date, estimate, estimate - margin, estimate + margin))
        .collect())
}
