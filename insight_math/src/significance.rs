//! Chi-square test of independence on 2x2 contingency tables

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// A 2x2 table of observed counts, `cells[row][col]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContingencyTable {
    pub cells: [[f64; 2]; 2],
}

impl ContingencyTable {
    /// Create a table from its four cells
    pub fn new(cells: [[f64; 2]; 2]) -> Self {
        Self { cells }
    }

    /// Build the converted / not-converted table for two groups
    ///
    /// Each row is `[converted, entered - converted]`.
    pub fn from_conversions(
        entered_a: f64,
        converted_a: f64,
        entered_b: f64,
        converted_b: f64,
    ) -> Self {
        Self::new([
            [converted_a, entered_a - converted_a],
            [converted_b, entered_b - converted_b],
        ])
    }

    /// True when every cell is strictly greater than `threshold`
    pub fn all_cells_exceed(&self, threshold: f64) -> bool {
        self.cells.iter().flatten().all(|&count| count > threshold)
    }

    fn row_total(&self, row: usize) -> f64 {
        self.cells[row][0] + self.cells[row][1]
    }

    fn col_total(&self, col: usize) -> f64 {
        self.cells[0][col] + self.cells[1][col]
    }

    fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }
}

/// Outcome of a chi-square test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareOutcome {
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
}

/// Pearson chi-square test for a 2x2 table, optionally with Yates' continuity
/// correction
#[derive(Debug, Clone, Copy)]
pub struct ChiSquareTest {
    yates_correction: bool,
}

impl Default for ChiSquareTest {
    fn default() -> Self {
        Self {
            yates_correction: true,
        }
    }
}

impl ChiSquareTest {
    /// Create a test, choosing whether to apply Yates' correction
    pub fn new(yates_correction: bool) -> Self {
        Self { yates_correction }
    }

    /// Run the test of independence on `table`
    pub fn test(&self, table: &ContingencyTable) -> Result<ChiSquareOutcome> {
        if table.cells.iter().flatten().any(|&c| c < 0.0 || !c.is_finite()) {
            return Err(MathError::InvalidInput(
                "Contingency counts must be finite and non-negative".to_string(),
            ));
        }

        let total = table.total();
        if total <= 0.0 {
            return Err(MathError::InsufficientData(
                "Contingency table is empty".to_string(),
            ));
        }

        let mut statistic = 0.0;
        for row in 0..2 {
            for col in 0..2 {
                let expected = table.row_total(row) * table.col_total(col) / total;
                if expected <= 0.0 {
                    return Err(MathError::CalculationError(format!(
                        "Expected frequency for cell ({}, {}) is zero",
                        row, col
                    )));
                }
                let mut deviation = (table.cells[row][col] - expected).abs();
                if self.yates_correction {
                    deviation -= deviation.min(0.5);
                }
                statistic += deviation * deviation / expected;
            }
        }

        let distribution = ChiSquared::new(1.0)
            .map_err(|e| MathError::CalculationError(format!("Chi-square distribution: {}", e)))?;
        let p_value = (1.0 - distribution.cdf(statistic)).clamp(0.0, 1.0);

        Ok(ChiSquareOutcome {
            statistic,
            p_value,
            degrees_of_freedom: 1,
        })
    }
}
