// Circular Fuser - Weighted Circular Mean
//
// Values on a wrap-around scale are mapped to unit vectors, summed with their
// weights, and mapped back through atan2. Averaging 350° and 10° yields 0°,
// and 23:50 with 00:10 yields 00:00.
//
// When the weighted vectors cancel exactly the direction is undefined; the
// first contributing value is returned instead.

use super::{collect_samples, FieldEstimate};
use crate::fusion::{FieldFusionError, FieldValue, Reading, Weight, WeightTable};
use std::f64::consts::TAU;
use tracing::info;
use wxfuse_common::ClockTime;

/// Resultant length (relative to total weight) below which vectors are
/// considered to cancel out
const DEGENERATE_RESULTANT: f64 = 1e-9;

/// Circle a circular field lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircularScale {
    /// Compass degrees, period 360
    Degrees,
    /// Minutes since midnight, period 1440
    Minutes,
}

impl CircularScale {
    pub fn period(self) -> f64 {
        match self {
            CircularScale::Degrees => 360.0,
            CircularScale::Minutes => 1440.0,
        }
    }

    pub fn to_radians(self, value: f64) -> f64 {
        value / self.period() * TAU
    }

    pub fn from_radians(self, radians: f64) -> f64 {
        radians / TAU * self.period()
    }

    /// Wrap into `[0, period)`
    pub fn normalize(self, value: f64) -> f64 {
        let period = self.period();
        let wrapped = value.rem_euclid(period);
        if period - wrapped < DEGENERATE_RESULTANT {
            0.0
        } else {
            wrapped
        }
    }
}

/// Accepted angle payload: any finite number of degrees, wrapped
pub fn accept_angle(value: &FieldValue) -> Option<f64> {
    value
        .as_finite_number()
        .map(|deg| CircularScale::Degrees.normalize(deg))
}

/// Accepted clock payload, as minutes since midnight: a finite number of
/// minutes (wrapped into one day), a clock time, or an `HH:MM` string
pub fn accept_clock_minutes(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(_) => value
            .as_finite_number()
            .map(|minutes| CircularScale::Minutes.normalize(minutes)),
        FieldValue::Clock(t) => Some(f64::from(t.minutes_since_midnight())),
        FieldValue::Text(s) => s
            .parse::<ClockTime>()
            .ok()
            .map(|t| f64::from(t.minutes_since_midnight())),
        _ => None,
    }
}

/// Fuse a compass-degree field
pub fn fuse_angle(
    field: &str,
    readings: &[&Reading],
    weights: &WeightTable,
) -> Result<FieldEstimate<f64>, FieldFusionError> {
    let samples = collect_samples(field, readings, weights, accept_angle);
    let mean = circular_mean(field, &samples.values, CircularScale::Degrees)?;
    Ok(samples.estimate(mean, 0.0))
}

/// Fuse a time-of-day field
pub fn fuse_clock(
    field: &str,
    readings: &[&Reading],
    weights: &WeightTable,
) -> Result<FieldEstimate<ClockTime>, FieldFusionError> {
    let samples = collect_samples(field, readings, weights, accept_clock_minutes);
    let mean = circular_mean(field, &samples.values, CircularScale::Minutes)?
        .map(|minutes| ClockTime::from_minutes_wrapping(minutes.round() as i64));
    Ok(samples.estimate(mean, ClockTime::MIDNIGHT))
}

/// Weighted circular mean of values already in `[0, period)`
///
/// Returns `Ok(None)` for an empty input.
pub fn circular_mean(
    field: &str,
    samples: &[(f64, Weight)],
    scale: CircularScale,
) -> Result<Option<f64>, FieldFusionError> {
    let Some(&(first, _)) = samples.first() else {
        return Ok(None);
    };
    if samples.iter().all(|(v, _)| *v == first) {
        return Ok(Some(first));
    }

    let total_weight: f64 = samples.iter().map(|(_, w)| *w).sum();
    if !(total_weight.is_finite() && total_weight > 0.0) {
        return Err(FieldFusionError::NonPositiveWeight {
            field: field.to_string(),
            total_weight,
        });
    }

    let (x, y) = samples.iter().fold((0.0_f64, 0.0_f64), |(x, y), (v, w)| {
        let theta = scale.to_radians(*v);
        (x + w * theta.cos(), y + w * theta.sin())
    });

    if x.hypot(y) <= DEGENERATE_RESULTANT * total_weight {
        info!(
            field = field,
            fallback = first,
            samples = samples.len(),
            "Circular values cancel out; using first contributing value"
        );
        return Ok(Some(first));
    }

    let mean = scale.normalize(scale.from_radians(y.atan2(x)));
    if !mean.is_finite() {
        return Err(FieldFusionError::NonFinite {
            field: field.to_string(),
        });
    }
    Ok(Some(mean))
}

/// Circular standard deviation `sqrt(-2 ln R̄)` of unweighted values, in the
/// scale's unit. `None` below two values; infinite when the values cancel.
pub fn circular_std_dev(values: &[f64], scale: CircularScale) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let (c, s) = values.iter().fold((0.0_f64, 0.0_f64), |(c, s), v| {
        let theta = scale.to_radians(*v);
        (c + theta.cos(), s + theta.sin())
    });
    let resultant = (c / n).hypot(s / n).min(1.0);
    if resultant <= DEGENERATE_RESULTANT {
        return Some(f64::INFINITY);
    }

    let radians = (-2.0 * resultant.ln()).max(0.0).sqrt();
    Some(scale.from_radians(radians))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn clock_reading(provider: &str, value: impl Into<FieldValue>) -> Reading {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Reading::new(provider, "Eilat", ts).with_field("moonrise", value)
    }

    fn hm(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    /// Shortest way round the circle between two points
    fn arc(scale: CircularScale, a: f64, b: f64) -> f64 {
        let d = scale.normalize(a - b);
        d.min(scale.period() - d)
    }

    #[test]
    fn test_angles_wrap_through_north() {
        let mean = circular_mean("wind", &[(350.0, 1.0), (10.0, 1.0)], CircularScale::Degrees)
            .unwrap()
            .unwrap();
        assert!(arc(CircularScale::Degrees, mean, 0.0) < 1e-6, "got {}", mean);
        assert!(mean < 360.0);
    }

    #[test]
    fn test_weighted_angle_leans_to_heavier_source() {
        let mean = circular_mean("wind", &[(0.0, 3.0), (90.0, 1.0)], CircularScale::Degrees)
            .unwrap()
            .unwrap();
        assert!(mean > 0.0 && mean < 45.0, "got {}", mean);
    }

    #[test]
    fn test_clock_wraps_through_midnight() {
        let table = WeightTable::default();
        let a = clock_reading("open_meteo", hm("23:50"));
        let b = clock_reading("open_meteo", hm("00:10"));

        let estimate = fuse_clock("moonrise", &[&a, &b], &table).unwrap();
        assert_eq!(estimate.value, ClockTime::MIDNIGHT);
        assert_eq!(estimate.contributors, 2);
    }

    #[test]
    fn test_clock_accepts_text_and_minutes() {
        assert_eq!(accept_clock_minutes(&FieldValue::Text("06:30".into())), Some(390.0));
        assert_eq!(accept_clock_minutes(&FieldValue::Text("dawn".into())), None);
        assert_eq!(accept_clock_minutes(&FieldValue::Number(390.0)), Some(390.0));
        assert_eq!(accept_clock_minutes(&FieldValue::Number(1450.0)), Some(10.0));
        assert_eq!(accept_clock_minutes(&FieldValue::Number(-30.0)), Some(1410.0));
        assert_eq!(accept_clock_minutes(&FieldValue::Number(f64::NAN)), None);
    }

    #[test]
    fn test_fuse_clock_from_minutes_since_midnight() {
        let table = WeightTable::default();
        let a = clock_reading("open_meteo", 350.0);
        let b = clock_reading("weatherapi", 354.0);

        let estimate = fuse_clock("moonrise", &[&a, &b], &table).unwrap();
        assert_eq!(estimate.value, hm("05:52"));
        assert_eq!(estimate.contributors, 2);
        assert_eq!(estimate.malformed, 0);

        let single = fuse_clock("moonrise", &[&a], &table).unwrap();
        assert_eq!(single.value, hm("05:50"));
    }

    #[test]
    fn test_fuse_clock_mixes_input_forms() {
        let table = WeightTable::default();
        let a = clock_reading("open_meteo", 1430.0);
        let b = clock_reading("open_meteo", "00:10");

        let estimate = fuse_clock("moonrise", &[&a, &b], &table).unwrap();
        assert_eq!(estimate.value, ClockTime::MIDNIGHT);
        assert_eq!(estimate.contributors, 2);
    }

    #[test]
    fn test_opposing_values_fall_back_to_first() {
        let mean = circular_mean("wind", &[(90.0, 1.0), (270.0, 1.0)], CircularScale::Degrees)
            .unwrap();
        assert_eq!(mean, Some(90.0));

        let mean = circular_mean("wind", &[(270.0, 1.0), (90.0, 1.0)], CircularScale::Degrees)
            .unwrap();
        assert_eq!(mean, Some(270.0));
    }

    #[test]
    fn test_single_angle_is_fixed_point() {
        let mean = circular_mean("wind", &[(123.4, 0.85)], CircularScale::Degrees).unwrap();
        assert_eq!(mean, Some(123.4));
    }

    #[test]
    fn test_accept_angle_wraps() {
        assert_eq!(accept_angle(&FieldValue::Number(-90.0)), Some(270.0));
        assert_eq!(accept_angle(&FieldValue::Number(720.0)), Some(0.0));
        assert_eq!(accept_angle(&FieldValue::Text("NW".into())), None);
    }

    #[test]
    fn test_circular_std_dev() {
        assert_eq!(circular_std_dev(&[10.0], CircularScale::Degrees), None);

        let tight = circular_std_dev(&[355.0, 5.0], CircularScale::Degrees).unwrap();
        let loose = circular_std_dev(&[300.0, 60.0], CircularScale::Degrees).unwrap();
        assert!(tight < loose);
        assert!(tight > 4.0 && tight < 6.0, "got {}", tight);

        let opposite = circular_std_dev(&[0.0, 180.0], CircularScale::Degrees).unwrap();
        assert!(opposite.is_infinite());

        let same = circular_std_dev(&[42.0, 42.0, 42.0], CircularScale::Degrees).unwrap();
        assert!(same.abs() < 1e-6);
    }
}
