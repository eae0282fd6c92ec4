use insight_math::MathError;
use segment_forecast::error::ForecastError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::Io(_)));

    let math_error = MathError::InsufficientData("empty".to_string());
    let forecast_error = ForecastError::from(math_error);
    assert!(matches!(forecast_error, ForecastError::Math(_)));

    let toml_error = toml::from_str::<toml::Value>("horizon = ").unwrap_err();
    let forecast_error = ForecastError::from(toml_error);
    assert!(matches!(forecast_error, ForecastError::Config(_)));
}

#[test]
fn test_error_display() {
    let error = ForecastError::MissingColumn("revenue".to_string());
    assert_eq!(error.to_string(), "Missing required column: revenue");

    let error = ForecastError::FallbackExhausted(vec![
        "simple_moving_average: too short".to_string(),
        "last_value: empty".to_string(),
    ]);
    let message = error.to_string();
    assert!(message.contains("simple_moving_average: too short"));
    assert!(message.contains("last_value: empty"));
}
