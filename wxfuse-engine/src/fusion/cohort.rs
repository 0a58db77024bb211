// Cohort Grouper - (place, time bucket) partitioning
//
// Daily buckets keep only the calendar date; hourly buckets truncate to the
// top of the hour. No reading is dropped here regardless of field coverage.

use crate::fusion::Reading;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Time-bucket size used to group readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Hourly,
}

impl Granularity {
    /// Canonical bucket start for a timestamp
    pub fn bucket_start(self, ts: NaiveDateTime) -> NaiveDateTime {
        let hour = match self {
            Granularity::Daily => 0,
            Granularity::Hourly => ts.hour(),
        };
        ts.date().and_hms_opt(hour, 0, 0).unwrap_or(ts)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Daily => write!(f, "daily"),
            Granularity::Hourly => write!(f, "hourly"),
        }
    }
}

/// Cohort identity. Orders by bucket first so iteration is chronological.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CohortKey {
    pub bucket: NaiveDateTime,
    pub place: String,
}

impl CohortKey {
    pub fn for_reading(reading: &Reading, granularity: Granularity) -> Self {
        Self {
            bucket: granularity.bucket_start(reading.observed_at),
            place: reading.place.clone(),
        }
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.place, self.bucket)
    }
}

/// Partition readings into cohorts, preserving input order inside each cohort
pub fn group_readings(
    readings: &[Reading],
    granularity: Granularity,
) -> BTreeMap<CohortKey, Vec<&Reading>> {
    let mut groups: BTreeMap<CohortKey, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        groups
            .entry(CohortKey::for_reading(reading, granularity))
            .or_default()
            .push(reading);
    }

    tracing::debug!(
        readings = readings.len(),
        cohorts = groups.len(),
        granularity = %granularity,
        "Grouped readings into cohorts"
    );

    groups
}
