use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use rstest::rstest;
use segment_forecast::ratios::{cpa, cpc, ctr, cvr, forecast_daily_ratios, forecast_totals, roas};
use segment_forecast::{Forecaster, MetricValues, Observation, Ratios, SegmentSeries};

#[rstest]
#[case(0.0, 0.0)]
#[case(250.0, 0.0)]
fn test_roas_without_spend_is_zero(#[case] revenue: f64, #[case] cost: f64) {
    assert_eq!(roas(revenue, cost), 0.0);
}

#[test]
fn test_roas_percent() {
    assert_relative_eq!(roas(150.0, 100.0), 150.0);
}

#[test]
fn test_every_ratio_is_zero_safe() {
    assert_eq!(ctr(10.0, 0.0), 0.0);
    assert_eq!(cpc(10.0, 0.0), 0.0);
    assert_eq!(cpa(10.0, 0.0), 0.0);
    assert_eq!(cvr(10.0, 0.0), 0.0);
    assert_eq!(Ratios::from_values(&MetricValues::default()), Ratios::default());
}

#[test]
fn test_forecast_ratios_follow_estimates() {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let rows: Vec<Observation> = (0..3)
        .map(|i| {
            Observation::new(
                start + Duration::days(i),
                MetricValues::new(100.0, 2000.0, 40.0, 4.0, 300.0),
            )
        })
        .collect();
    let series = SegmentSeries::from_observations("channel", "Search", &rows);
    let forecast = Forecaster::new(5, 0.8).unwrap().forecast_series(&series).unwrap();

    let daily = forecast_daily_ratios(&forecast);
    assert_eq!(daily.len(), 5);
    assert_eq!(daily[0].date, start + Duration::days(3));
    assert_relative_eq!(daily[0].ratios.roas, 300.0);
    assert_relative_eq!(daily[0].ratios.ctr, 2.0);
    assert_relative_eq!(daily[4].ratios.cpa, 25.0);

    let totals = forecast_totals(&forecast);
    assert_relative_eq!(totals.cost, 500.0);
    assert_relative_eq!(totals.revenue, 1500.0);
}
