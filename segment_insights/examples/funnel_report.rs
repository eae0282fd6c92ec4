//! Run the insight engine on a CSV file, or on a generated dataset when no
//! path is given, and print the report as JSON.
//!
//! ```text
//! cargo run -p segment_insights --example funnel_report -- data.csv [config.toml]
//! ```

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use segment_forecast::{Dataset, EngineConfig, MetricValues, Observation};
use segment_insights::InsightEngine;
use std::fs::File;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.get(1) {
        Some(path) => EngineConfig::load(Path::new(path))?,
        None => EngineConfig::default(),
    };
    let dataset = match args.first() {
        Some(path) => Dataset::from_csv_reader(File::open(path)?, &config)?,
        None => demo_dataset(),
    };

    let report = InsightEngine::new(config).run(&dataset)?;

    eprintln!(
        "{} observations, {} churn / {} improvement signals, {} alerts",
        report.summary.observations,
        report.trend_signals.churn.len(),
        report.trend_signals.improvement.len(),
        report.alerts.len()
    );
    for alert in &report.alerts {
        eprintln!("[{}] {}", alert.severity, alert.message);
    }
    println!("{}", report.to_json_pretty()?);

    Ok(())
}

/// 120 days of three channels; Display loses a third of its conversions in
/// the final week
fn demo_dataset() -> Dataset {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid start date");
    (0..120i64)
        .flat_map(|day| {
            let date = start + Duration::days(day);
            let weekend = match date.weekday() {
                Weekday::Sat | Weekday::Sun => 0.8,
                _ => 1.0,
            };
            let display_conversions = if day >= 113 { 20.0 } else { 30.0 };
            [
                ("Search", 400.0, 1500.0, 75.0, 4200.0),
                ("Social", 250.0, 1100.0, 40.0, 1900.0),
                ("Display", 300.0, 900.0, display_conversions, 250.0),
            ]
            .into_iter()
            .map(move |(channel, cost, clicks, conversions, revenue)| {
                Observation::new(
                    date,
                    MetricValues::new(
                        cost * weekend,
                        clicks * 25.0 * weekend,
                        clicks * weekend,
                        conversions * weekend,
                        revenue * weekend,
                    ),
                )
                .with_segment("channel", channel)
            })
        })
        .collect()
}
