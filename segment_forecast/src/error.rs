//! Error types for the segment_forecast crate

use insight_math::MathError;
use thiserror::Error;

/// Custom error types for the segment_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A metric or segment has no data points to forecast from
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A forecast variant failed to fit or produced unusable output
    #[error("Model fit error: {0}")]
    ModelFit(String),

    /// A required input column is absent
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Every variant of a fallback chain failed
    #[error("All forecast variants failed: {}", .0.join("; "))]
    FallbackExhausted(Vec<String>),

    /// Configuration could not be parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from numeric primitives
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}
