// Fusers - Weight-Aware Per-Field Combination
//
// scalar      - weighted mean
// circular    - weighted circular mean (angles, clock times)
// categorical - weighted plurality vote
//
// Every fuser skips readings that omit the field and counts values that are
// present but malformed, without failing the rest of the reading.

pub mod categorical;
pub mod circular;
pub mod scalar;

use crate::fusion::{FieldValue, Reading, Weight, WeightTable};
use tracing::debug;

/// Fused value of one field plus provenance counters
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEstimate<T> {
    pub value: T,
    pub contributors: usize,
    pub total_weight: Weight,
    pub malformed: usize,
}

/// Accepted (value, weight) pairs for one field across a cohort
#[derive(Debug, Clone, PartialEq)]
pub struct Samples<T> {
    pub values: Vec<(T, Weight)>,
    pub malformed: usize,
}

impl<T> Samples<T> {
    pub fn total_weight(&self) -> Weight {
        self.values.iter().map(|(_, w)| *w).sum()
    }

    /// Wrap a fused value (or the no-data default) with this sample's counters
    ///
    /// The output type may differ from the sample type: clock fields are
    /// averaged as minutes and reported as `ClockTime`.
    pub(crate) fn estimate<U>(&self, value: Option<U>, no_data: U) -> FieldEstimate<U> {
        match value {
            Some(value) => FieldEstimate {
                value,
                contributors: self.values.len(),
                total_weight: self.total_weight(),
                malformed: self.malformed,
            },
            None => FieldEstimate {
                value: no_data,
                contributors: 0,
                total_weight: 0.0,
                malformed: self.malformed,
            },
        }
    }
}

/// Collect accepted values for `field`, in reading order, with provider weights
///
/// `accept` returns `None` for a present value of the wrong shape; such values
/// are counted as malformed and logged.
pub fn collect_samples<T, F>(
    field: &str,
    readings: &[&Reading],
    weights: &WeightTable,
    accept: F,
) -> Samples<T>
where
    F: Fn(&FieldValue) -> Option<T>,
{
    let mut values = Vec::with_capacity(readings.len());
    let mut malformed = 0;

    for reading in readings {
        let Some(raw) = reading.value(field) else {
            continue;
        };
        match accept(raw) {
            Some(value) => values.push((value, weights.weight_for(&reading.provider))),
            None => {
                malformed += 1;
                debug!(
                    field = field,
                    provider = %reading.provider,
                    value = ?raw,
                    "Skipping malformed value"
                );
            }
        }
    }

    Samples { values, malformed }
}

/// Unweighted accepted values for `field` (agreement scoring input)
pub fn raw_values<T, F>(field: &str, readings: &[&Reading], accept: F) -> Vec<T>
where
    F: Fn(&FieldValue) -> Option<T>,
{
    readings
        .iter()
        .filter_map(|r| r.value(field))
        .filter_map(accept)
        .collect()
}
