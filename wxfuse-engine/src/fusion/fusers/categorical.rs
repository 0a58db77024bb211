// Categorical Fuser - Weighted Plurality Vote
//
// Each reading votes for its label with its provider's weight; the label with
// the largest summed weight wins. On equal sums the label seen first in the
// cohort wins.

use super::{collect_samples, FieldEstimate};
use crate::fusion::{FieldValue, Reading, Weight, WeightTable};

/// Label reported when no reading supplies the field
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Accepted label payload: non-empty text (a clock-shaped string counts too)
pub fn accept(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) if !s.trim().is_empty() => Some(s.clone()),
        FieldValue::Clock(t) => Some(t.to_string()),
        _ => None,
    }
}

/// Fuse one label field across a cohort
///
/// Never fails: a vote needs no arithmetic that can overflow.
pub fn fuse_label(
    field: &str,
    readings: &[&Reading],
    weights: &WeightTable,
) -> FieldEstimate<String> {
    let samples = collect_samples(field, readings, weights, accept);
    let winner = weighted_plurality(&samples.values);
    samples.estimate(winner, UNKNOWN_LABEL.to_string())
}

/// Label with the greatest summed weight; earliest label wins ties
pub fn weighted_plurality(votes: &[(String, Weight)]) -> Option<String> {
    // Vec keeps first-seen order for the tie-break
    let mut tally: Vec<(&str, Weight)> = Vec::new();
    for (label, weight) in votes {
        match tally.iter_mut().find(|(l, _)| *l == label.as_str()) {
            Some((_, sum)) => *sum += weight,
            None => tally.push((label.as_str(), *weight)),
        }
    }

    let mut best: Option<(&str, Weight)> = None;
    for (label, sum) in tally {
        match best {
            Some((_, top)) if sum <= top => {}
            _ => best = Some((label, sum)),
        }
    }
    best.map(|(label, _)| label.to_string())
}
