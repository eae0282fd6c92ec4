//! # Insight Math
//!
//! Numeric building blocks shared by the segment forecasting and insight crates.
//! Every routine here is a pure function of its inputs (the k-means routine
//! takes an explicit seed), so results are reproducible run to run.

use thiserror::Error;

pub mod clustering;
pub mod moving_averages;
pub mod significance;
pub mod statistics;

pub use clustering::{KMeans, KMeansFit};
pub use moving_averages::{LinearWeightedMovingAverage, SimpleMovingAverage};
pub use significance::{ChiSquareTest, ContingencyTable};
pub use statistics::{mean, sample_std_dev, standardize_columns, z_scores};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Divide `numerator` by `denominator`, returning exactly `0.0` whenever the
/// denominator is zero or the quotient is not finite.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_divide_regular() {
        assert_eq!(safe_divide(150.0, 100.0), 1.5);
    }

    #[test]
    fn test_safe_divide_zero_denominator() {
        assert_eq!(safe_divide(42.0, 0.0), 0.0);
        assert_eq!(safe_divide(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_safe_divide_non_finite() {
        assert_eq!(safe_divide(f64::NAN, 2.0), 0.0);
        assert_eq!(safe_divide(1.0, f64::NAN), 0.0);
        assert_eq!(safe_divide(f64::MAX, 1e-300), 0.0);
        assert_eq!(safe_divide(1.0, f64::INFINITY), 0.0);
    }
}
