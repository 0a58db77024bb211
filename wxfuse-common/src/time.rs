//! Clock-time utilities
//!
//! Sunrise, sunset, moonrise and moonset arrive as wall-clock times with no
//! date attached. [`ClockTime`] stores them as minutes since midnight so they
//! can be placed on a 24-hour circle.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Minutes in one day; the period of the clock circle.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Wall-clock time of day with minute resolution.
///
/// Always in `[00:00, 23:59]`. Serialized as zero-padded `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    /// Midnight (`00:00`).
    pub const MIDNIGHT: ClockTime = ClockTime { minutes: 0 };

    /// Build from hour and minute, rejecting out-of-range components
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self> {
        if hour >= 24 || minute >= 60 {
            return Err(Error::InvalidInput(format!(
                "clock time {:02}:{:02} is out of range",
                hour, minute
            )));
        }
        Ok(Self {
            minutes: hour * 60 + minute,
        })
    }

    /// Build from minutes since midnight, wrapping values past 24:00
    pub fn from_minutes_wrapping(minutes: i64) -> Self {
        let wrapped = minutes.rem_euclid(i64::from(MINUTES_PER_DAY));
        Self {
            minutes: wrapped as u16,
        }
    }

    pub fn minutes_since_midnight(self) -> u16 {
        self.minutes
    }

    pub fn hour(self) -> u16 {
        self.minutes / 60
    }

    pub fn minute(self) -> u16 {
        self.minutes % 60
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (hour, minute) = trimmed
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("'{}' is not HH:MM", trimmed)))?;

        let parse = |part: &str| -> Result<u16> {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidInput(format!("'{}' is not HH:MM", trimmed)));
            }
            part.parse::<u16>()
                .map_err(|e| Error::InvalidInput(format!("'{}': {}", trimmed, e)))
        };

        Self::from_hm(parse(hour)?, parse(minute)?)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
