use chrono::{Duration, NaiveDate};
use rstest::rstest;
use segment_forecast::aggregation::aggregate_by_dimension;
use segment_forecast::{
    Dataset, ForecastError, ForecastVariant, Forecaster, Metric, MetricValues, Observation,
    SegmentSeries,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// A single-segment series of `days` consecutive days with a gentle weekly wave
fn series_of(days: i64) -> SegmentSeries {
    let dataset: Dataset = (0..days)
        .map(|i| {
            let wave = (i % 7) as f64;
            Observation::new(
                start() + Duration::days(i),
                MetricValues::new(50.0 + wave, 1000.0 + 10.0 * wave, 40.0 + wave, 4.0, 120.0 + wave),
            )
            .with_segment("channel", "Search")
        })
        .collect();
    aggregate_by_dimension(&dataset, "channel", |v| v.is_empty())
        .remove("Search")
        .unwrap()
}

#[rstest]
#[case(1, ForecastVariant::LastValue)]
#[case(6, ForecastVariant::LastValue)]
#[case(7, ForecastVariant::SimpleMovingAverage)]
#[case(13, ForecastVariant::SimpleMovingAverage)]
#[case(14, ForecastVariant::WeightedMovingAverage)]
#[case(29, ForecastVariant::WeightedMovingAverage)]
#[case(30, ForecastVariant::SeasonalTrend { yearly: false })]
#[case(99, ForecastVariant::SeasonalTrend { yearly: false })]
#[case(100, ForecastVariant::SeasonalTrend { yearly: true })]
fn test_model_selection(#[case] days: usize, #[case] expected: ForecastVariant) {
    assert_eq!(ForecastVariant::select(days), expected);
}

#[rstest]
#[case(5)]
#[case(10)]
#[case(20)]
#[case(45)]
fn test_forecast_covers_horizon(#[case] days: i64) {
    let forecaster = Forecaster::new(30, 0.8).unwrap();
    let result = forecaster.forecast_series(&series_of(days)).unwrap();

    assert_eq!(result.history_days, days as usize);
    assert_eq!(result.metrics.len(), Metric::ALL.len());
    for forecast in result.metrics.values() {
        assert_eq!(forecast.points.len(), 30);
        let first = forecast.points[0].date;
        assert_eq!(first, start() + Duration::days(days));
        for point in &forecast.points {
            assert!(point.estimate >= 0.0);
            assert!(point.lower >= 0.0);
            assert!(point.lower <= point.estimate && point.estimate <= point.upper);
        }
    }
}

#[test]
fn test_short_series_repeats_last_value() {
    let forecaster = Forecaster::new(30, 0.8).unwrap();
    let result = forecaster.forecast_series(&series_of(5)).unwrap();
    assert_eq!(result.model_used, ForecastVariant::LastValue);

    let cost = &result.metrics[&Metric::Cost];
    // day index 4 has wave 4
    assert!(cost.points.iter().all(|p| p.estimate == 54.0));
}

#[test]
fn test_seasonal_failure_falls_back() {
    // six points cannot support the seasonal regression nor either moving average
    let forecaster = Forecaster::new(10, 0.8).unwrap();
    let dates: Vec<NaiveDate> = (0..6).map(|i| start() + Duration::days(i * 5)).collect();
    let values = vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

    let forecast = forecaster
        .forecast_values(&dates, &values, ForecastVariant::SeasonalTrend { yearly: false })
        .unwrap();
    assert_eq!(forecast.model_used, ForecastVariant::LastValue);
    assert_eq!(forecast.points.len(), 10);
    assert!(forecast.points.iter().all(|p| p.estimate == 8.0));
}

#[test]
fn test_empty_input_is_an_error() {
    let forecaster = Forecaster::new(30, 0.8).unwrap();
    let result = forecaster.forecast_values(&[], &[], ForecastVariant::LastValue);
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[rstest]
#[case(0, 0.8)]
#[case(30, 0.0)]
#[case(30, 1.0)]
fn test_invalid_forecaster(#[case] horizon: usize, #[case] width: f64) {
    assert!(matches!(
        Forecaster::new(horizon, width),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_variant_serializes_with_kind_tag() {
    let json = serde_json::to_string(&ForecastVariant::SeasonalTrend { yearly: true }).unwrap();
    assert_eq!(json, r#"{"kind":"seasonal_trend","yearly":true}"#);
    let json = serde_json::to_string(&ForecastVariant::LastValue).unwrap();
    assert_eq!(json, r#"{"kind":"last_value"}"#);
}

/// Daily series with a weekly wave, a slow yearly swing and a little noise
fn long_values(days: i64) -> Vec<f64> {
    (0..days)
        .map(|i| {
            let t = i as f64;
            let weekly = if i % 7 == 5 { 8.0 } else { 0.0 };
            let yearly = 15.0 * (2.0 * std::f64::consts::PI * t / 365.25).sin();
            let noise = ((i * 37) % 11) as f64 * 0.2;
            100.0 + 0.02 * t + weekly + yearly + noise
        })
        .collect()
}

#[test]
fn test_long_history_fits_yearly_seasonality() {
    let forecaster = Forecaster::new(30, 0.8).unwrap();
    let dates: Vec<NaiveDate> = (0..400).map(|i| start() + Duration::days(i)).collect();
    let values = long_values(400);

    let forecast = forecaster
        .forecast_values(&dates, &values, ForecastVariant::select(dates.len()))
        .unwrap();
    assert_eq!(forecast.model_used, ForecastVariant::SeasonalTrend { yearly: true });
    assert_eq!(forecast.points.len(), 30);
    assert!(forecast
        .points
        .iter()
        .all(|p| p.estimate > 70.0 && p.estimate < 140.0));
}

#[test]
fn test_long_but_short_span_history_is_weekly_only() {
    let forecaster = Forecaster::new(30, 0.8).unwrap();
    let dates: Vec<NaiveDate> = (0..120).map(|i| start() + Duration::days(i)).collect();
    let values = long_values(120);

    let forecast = forecaster
        .forecast_values(&dates, &values, ForecastVariant::select(dates.len()))
        .unwrap();
    assert_eq!(forecast.model_used, ForecastVariant::SeasonalTrend { yearly: false });
}

#[test]
fn test_weekly_cadence_history_gives_sane_forecast() {
    let forecaster = Forecaster::new(5, 0.8).unwrap();
    let dates: Vec<NaiveDate> = (0..40).map(|i| start() + Duration::days(7 * i)).collect();
    let values: Vec<f64> = (0..40)
        .map(|i| 10.0 + i as f64 + ((i * 37) % 11) as f64 * 0.05)
        .collect();

    let forecast = forecaster
        .forecast_values(&dates, &values, ForecastVariant::select(dates.len()))
        .unwrap();
    assert_eq!(forecast.points.len(), 5);
    assert!(forecast
        .points
        .iter()
        .all(|p| p.estimate > 40.0 && p.estimate < 60.0));
}

#[test]
fn test_series_with_gaps_through_forecast_series() {
    // Tuesdays and Thursdays missing
    let dataset: Dataset = (0..70)
        .filter(|i| i % 7 != 1 && i % 7 != 3)
        .map(|i| {
            Observation::new(
                start() + Duration::days(i),
                MetricValues::new(50.0 + (i % 5) as f64, 1000.0, 40.0, 4.0, 120.0),
            )
            .with_segment("channel", "Search")
        })
        .collect();
    let series = aggregate_by_dimension(&dataset, "channel", |v| v.is_empty())
        .remove("Search")
        .unwrap();

    let forecaster = Forecaster::new(14, 0.8).unwrap();
    let result = forecaster.forecast_series(&series).unwrap();
    assert_eq!(result.history_days, 50);
    for forecast in result.metrics.values() {
        assert_eq!(forecast.points.len(), 14);
    }
    let cost = &result.metrics[&Metric::Cost];
    assert!(cost.points.iter().all(|p| p.estimate > 45.0 && p.estimate < 60.0));
}
