//! Error types for the segment_insights crate

use insight_math::MathError;
use segment_forecast::ForecastError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    /// The dataset cannot support an analysis run
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from the forecasting pipeline
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// Error from numeric primitives
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// The report could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;
