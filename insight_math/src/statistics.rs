//! Descriptive statistics
//!
//! Mean, standard deviation, absolute z-scores and column standardization.

use crate::{MathError, Result};

/// Arithmetic mean of `values`
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Sample standard deviation needs at least 2 values, have {}",
            values.len()
        )));
    }
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// Population standard deviation (n denominator)
pub fn population_std_dev(values: &[f64]) -> Result<f64> {
    let avg = mean(values)?;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// Absolute z-score `|x - mean| / std` of every value, using the sample
/// standard deviation.
///
/// A series with zero spread has no meaningful z-scores and yields
/// `CalculationError`.
pub fn z_scores(values: &[f64]) -> Result<Vec<f64>> {
    let avg = mean(values)?;
    let std = sample_std_dev(values)?;
    if std <= f64::EPSILON {
        return Err(MathError::CalculationError(
            "Standard deviation is zero, z-scores are undefined".to_string(),
        ));
    }
    Ok(values.iter().map(|v| (v - avg).abs() / std).collect())
}

/// Standardize each column of a row-major matrix to zero mean and unit
/// (population) variance. Columns with zero variance become all zeros.
pub fn standardize_columns(rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let first = rows.first().ok_or_else(|| {
        MathError::InsufficientData("Cannot standardize an empty matrix".to_string())
    })?;
    let width = first.len();
    if rows.iter().any(|row| row.len() != width) {
        return Err(MathError::InvalidInput(
            "All rows must have the same number of features".to_string(),
        ));
    }

    let mut scaled = rows.to_vec();
    for col in 0..width {
        let column: Vec<f64> = rows.iter().map(|row| row[col]).collect();
        let avg = mean(&column)?;
        let std = population_std_dev(&column)?;
        for row in scaled.iter_mut() {
            row[col] = if std > f64::EPSILON {
                (row[col] - avg) / std
            } else {
                0.0
            };
        }
    }

    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_std_dev(&values).unwrap(), 2.0);
        assert_relative_eq!(
            sample_std_dev(&values).unwrap(),
            (32.0f64 / 7.0).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert!(mean(&[]).is_err());
        assert!(sample_std_dev(&[1.0]).is_err());
    }

    #[test]
    fn test_z_scores_flag_spike() {
        let mut values = vec![10.0; 30];
        values.push(100.0);
        let scores = z_scores(&values).unwrap();
        assert!(scores[30] > 3.0);
        assert!(scores[..30].iter().all(|z| *z < 1.0));
    }

    #[test]
    fn test_z_scores_constant_series() {
        assert!(matches!(
            z_scores(&[3.0, 3.0, 3.0]),
            Err(MathError::CalculationError(_))
        ));
    }

    #[test]
    fn test_standardize_columns() {
        let rows = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]];
        let scaled = standardize_columns(&rows).unwrap();
        let col0: Vec<f64> = scaled.iter().map(|r| r[0]).collect();
        assert_relative_eq!(mean(&col0).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(population_std_dev(&col0).unwrap(), 1.0, epsilon = 1e-12);
        assert!(scaled.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_standardize_ragged_rows() {
        let rows = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(standardize_columns(&rows).is_err());
    }
}
