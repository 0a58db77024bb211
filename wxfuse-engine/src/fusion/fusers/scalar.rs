// Scalar Fuser - Weighted Mean
//
// result = Σ(value·weight) / Σ(weight), over readings that report the field.
// A single contributing value (or identical values) is returned verbatim.

use super::{collect_samples, FieldEstimate};
use crate::fusion::{FieldFusionError, FieldValue, Reading, Weight, WeightTable};

/// Scalar value reported when no reading supplies the field
pub const NO_DATA: f64 = 0.0;

/// Accepted scalar payload: a finite number
pub fn accept(value: &FieldValue) -> Option<f64> {
    value.as_finite_number()
}

/// Fuse one real-valued field across a cohort
pub fn fuse_scalar(
    field: &str,
    readings: &[&Reading],
    weights: &WeightTable,
) -> Result<FieldEstimate<f64>, FieldFusionError> {
    let samples = collect_samples(field, readings, weights, accept);
    let mean = weighted_mean(field, &samples.values)?;
    Ok(samples.estimate(mean, NO_DATA))
}

/// Weighted arithmetic mean, clamped to the input range
///
/// Returns `Ok(None)` for an empty input.
pub fn weighted_mean(
    field: &str,
    samples: &[(f64, Weight)],
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

    let weighted_sum: f64 = samples.iter().map(|(v, w)| v * w).sum();
    let mean = weighted_sum / total_weight;
    if !mean.is_finite() {
        return Err(FieldFusionError::NonFinite {
            field: field.to_string(),
        });
    }

    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (v, _)| {
            (lo.min(*v), hi.max(*v))
        });

    Ok(Some(mean.clamp(min, max)))
}
