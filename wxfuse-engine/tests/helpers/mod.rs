//! Shared test helpers for engine integration tests

#![allow(dead_code)]

pub mod log_capture;

use chrono::{NaiveDate, NaiveDateTime};
use wxfuse_engine::Reading;

/// Timestamp on 2025-04-20 at `hour:minute`
pub fn ts(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 20)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Timestamp on `day` April 2025 at `hour:00`
pub fn day_at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Reading with a single numeric field
pub fn reading(provider: &str, place: &str, at: NaiveDateTime, field: &str, value: f64) -> Reading {
    Reading::new(provider, place, at).with_field(field, value)
}
