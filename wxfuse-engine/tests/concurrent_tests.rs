//! Concurrent fusion must match sequential fusion

mod helpers;

use helpers::{day_at, ts};
use std::sync::Arc;
use wxfuse_common::config::FusionSettings;
use wxfuse_engine::{FusionEngine, Granularity, Reading};

const PROVIDERS: [&str; 5] = ["open_meteo", "7timer", "openweathermap", "windy", "hobbyist"];
const PLACES: [&str; 3] = ["Haifa", "Eilat", "Tel Aviv"];

fn hourly_batch() -> Vec<Reading> {
    let mut readings = Vec::new();
    for hour in 0..12u32 {
        for (p, provider) in PROVIDERS.iter().enumerate() {
            for (i, place) in PLACES.iter().enumerate() {
                // Leave some cohorts with a single reading so they fall under the gate
                if (hour as usize + i) % 5 == 0 && p > 0 {
                    continue;
                }
                let offset = (p * 3 + i) as f64;
                readings.push(
                    Reading::new(provider, place, ts(hour, (p as u32 * 7) % 60))
                        .with_field("temperature_c", 18.0 + hour as f64 * 0.5 + offset * 0.3)
                        .with_field("wind_speed_knots", 8.0 + offset)
                        .with_field("wind_direction_deg", (350.0 + offset * 6.0) % 360.0)
                        .with_field("humidity_percent", 55.0 + offset),
                );
            }
        }
    }
    readings
}

fn daily_batch() -> Vec<Reading> {
    let mut readings = Vec::new();
    for day in 1..=6u32 {
        for (p, provider) in PROVIDERS.iter().enumerate().take(day as usize % 4 + 1) {
            readings.push(
                Reading::new(provider, "Haifa", day_at(day, 6 + p as u32))
                    .with_field("temp_high", 24.0 + p as f64)
                    .with_field("temp_low", 14.0 - p as f64 * 0.5)
                    .with_field("wind_direction", if p % 2 == 0 { "W" } else { "NW" })
                    .with_field("sunset", "19:05"),
            );
        }
    }
    readings
}

#[tokio::test]
async fn test_concurrent_matches_sequential_hourly() {
    let engine = Arc::new(FusionEngine::new(&FusionSettings::default()).unwrap());
    let readings = hourly_batch();

    let sequential = engine.fuse(&readings, Granularity::Hourly);
    let concurrent = Arc::clone(&engine)
        .fuse_concurrent(readings, Granularity::Hourly, 4)
        .await;

    assert_eq!(concurrent, sequential);
    assert!(sequential.rejections().count() > 0);
    assert!(sequential.records().count() > 0);
}

#[tokio::test]
async fn test_concurrent_matches_sequential_daily() {
    let engine = Arc::new(FusionEngine::default());
    let readings = daily_batch();

    let sequential = engine.fuse(&readings, Granularity::Daily);
    for workers in [1, 2, 8] {
        let concurrent = Arc::clone(&engine)
            .fuse_concurrent(readings.clone(), Granularity::Daily, workers)
            .await;
        assert_eq!(concurrent, sequential, "workers = {}", workers);
    }
}

#[tokio::test]
async fn test_concurrent_respects_hourly_horizon() {
    let settings = FusionSettings {
        hourly_horizon: Some(3),
        ..FusionSettings::default()
    };
    let engine = Arc::new(FusionEngine::new(&settings).unwrap());

    let report = engine
        .fuse_concurrent(hourly_batch(), Granularity::Hourly, 3)
        .await;

    let mut buckets: Vec<_> = report.cohorts.iter().map(|c| c.key.bucket).collect();
    buckets.dedup();
    assert_eq!(buckets, vec![ts(0, 0), ts(1, 0), ts(2, 0)]);
}

#[tokio::test]
async fn test_concurrent_empty_batch() {
    let engine = Arc::new(FusionEngine::default());
    let report = engine.fuse_concurrent(Vec::new(), Granularity::Daily, 0).await;
    assert!(report.is_empty());
}
