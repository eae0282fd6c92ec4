//! Moving average calculation implementations
//!
//! Contains the two windowed estimators used for flat projections:
//! - Simple Moving Average (SMA)
//! - Linear Weighted Moving Average (LWMA), weights 1..=period with the most
//!   recent value weighted highest

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Build an SMA already primed with the trailing values of `series`
    pub fn from_series(period: usize, series: &[f64]) -> Result<Self> {
        let mut sma = Self::new(period)?;
        let start = series.len().saturating_sub(period);
        for &value in &series[start..] {
            sma.update(value)?;
        }
        Ok(sma)
    }

    /// Update the SMA with a new value
    pub fn update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "SMA input must be finite, got {}",
                value
            )));
        }

        self.values.push_back(value);
        self.sum += value;

        // Remove oldest value if we have more than period values
        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }

        Ok(())
    }

    /// Get the current SMA value
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }

    /// Values currently inside the window, oldest first
    pub fn window(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the SMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Linear Weighted Moving Average (LWMA) implementation
///
/// With a full window of `n` values the oldest carries weight 1 and the newest
/// weight `n`; the result is `sum(w_i * x_i) / sum(w_i)`.
#[derive(Debug, Clone)]
pub struct LinearWeightedMovingAverage {
    period: usize,
    values: VecDeque<f64>,
}

impl LinearWeightedMovingAverage {
    /// Create a new LWMA with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Build an LWMA already primed with the trailing values of `series`
    pub fn from_series(period: usize, series: &[f64]) -> Result<Self> {
        let mut lwma = Self::new(period)?;
        let start = series.len().saturating_sub(period);
        for &value in &series[start..] {
            lwma.update(value)?;
        }
        Ok(lwma)
    }

    /// Update the LWMA with a new value
    pub fn update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "LWMA input must be finite, got {}",
                value
            )));
        }

        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }

        Ok(())
    }

    /// Get the current LWMA value
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for LWMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        let (weighted_sum, weight_total) = self
            .values
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sum, total), (i, &value)| {
                let weight = (i + 1) as f64;
                (sum + weight * value, total + weight)
            });

        Ok(weighted_sum / weight_total)
    }

    /// Values currently inside the window, oldest first
    pub fn window(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the LWMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}
