use segment_forecast::data::{Dataset, Metric};
use segment_forecast::{EngineConfig, ForecastError};
use std::io::Cursor;

fn config_with(dimensions: &[&str], stages: &[&str]) -> EngineConfig {
    EngineConfig {
        dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
        funnel_stages: stages.iter().map(|s| s.to_string()).collect(),
        ..EngineConfig::default()
    }
}

#[test]
fn test_from_csv_reader() {
    let csv = "\
date,channel,brand,cost,impressions,clicks,conversions,revenue
2024-01-01,Search,Acme,100,1000,50,5,150
2024-01-02,Social,Acme,n/a,800,,2,40
bad-date,Search,Acme,1,1,1,1,1
2024-01-03,-,Acme,10,100,10,1,20
";
    let config = config_with(&["channel", "brand"], &["impressions", "clicks", "conversions"]);
    let dataset = Dataset::from_csv_reader(Cursor::new(csv), &config).unwrap();

    // the unparsable date is dropped, everything else is kept
    assert_eq!(dataset.len(), 3);
    let social = &dataset.observations()[1];
    assert_eq!(social.segment("channel"), Some("Social"));
    assert_eq!(social.values.cost, 0.0);
    assert_eq!(social.values.clicks, 0.0);
    assert_eq!(social.values.get(Metric::Impressions), 800.0);
}

#[test]
fn test_headers_are_case_insensitive() {
    let csv = "Date,Channel,Cost,Impressions,Clicks,Conversions,Revenue\n2024-01-01,Search,1,2,3,4,5\n";
    let config = config_with(&["channel"], &["impressions", "conversions"]);
    let dataset = Dataset::from_csv_reader(Cursor::new(csv), &config).unwrap();
    assert_eq!(dataset.observations()[0].values.revenue, 5.0);
}

#[test]
fn test_missing_metric_column_is_fatal() {
    let csv = "date,channel,cost,impressions,clicks,conversions\n2024-01-01,Search,1,2,3,4\n";
    let config = config_with(&["channel"], &["impressions", "conversions"]);
    let result = Dataset::from_csv_reader(Cursor::new(csv), &config);
    assert!(matches!(result, Err(ForecastError::MissingColumn(ref c)) if c == "revenue"));
}

#[test]
fn test_missing_dimension_column_is_fatal() {
    let csv = "date,cost,impressions,clicks,conversions,revenue\n2024-01-01,1,2,3,4,5\n";
    let config = config_with(&["channel"], &["impressions", "conversions"]);
    let result = Dataset::from_csv_reader(Cursor::new(csv), &config);
    assert!(matches!(result, Err(ForecastError::MissingColumn(ref c)) if c == "channel"));
}

#[test]
fn test_extra_funnel_stage_columns() {
    let csv = "\
date,channel,cost,impressions,clicks,conversions,revenue,sessions,add_to_cart
2024-01-01,Search,1,2,3,4,5,300,20
";
    let config = config_with(&["channel"], &["sessions", "add_to_cart", "conversions"]);
    let dataset = Dataset::from_csv_reader(Cursor::new(csv), &config).unwrap();
    let obs = &dataset.observations()[0];
    assert_eq!(obs.column_value("sessions"), 300.0);
    assert_eq!(obs.column_value("add_to_cart"), 20.0);
    assert_eq!(obs.column_value("conversions"), 4.0);

    let missing = config_with(&["channel"], &["sessions", "checkout"]);
    assert!(matches!(
        Dataset::from_csv_reader(Cursor::new(csv), &missing),
        Err(ForecastError::MissingColumn(_))
    ));
}
