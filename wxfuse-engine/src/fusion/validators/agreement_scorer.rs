// Agreement Scorer - Confidence from Cross-Source Dispersion
//
// Per scored field:  sub_score = max(0, 100 - std_dev × k)
// Coverage:          min(100, distinct_providers / saturation × 100)
// Confidence:        unweighted mean of all sub-scores, clamped to [0, 100]
//
// Dispersion uses raw, unweighted values. Scalars use the sample standard
// deviation; angles and clock times use the circular standard deviation in
// the field's own unit.

use crate::fusion::fusers::circular::{self, CircularScale};
use crate::fusion::fusers::{raw_values, scalar};
use crate::fusion::{FieldKind, FieldSchema, FusedField, Reading};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wxfuse_common::config::FusionSettings;

/// Dispersion sub-score for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub field: String,
    pub std_dev: f64,
    pub score: f64,
}

/// Audit trail behind a confidence value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementBreakdown {
    pub field_scores: Vec<SubScore>,
    /// Present only when at least one field produced a dispersion sub-score
    pub coverage: Option<f64>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgreementScorer {
    coverage_saturation: usize,
    neutral_confidence: f64,
}

impl Default for AgreementScorer {
    fn default() -> Self {
        Self::from_settings(&FusionSettings::default())
    }
}

impl AgreementScorer {
    pub fn new(coverage_saturation: usize, neutral_confidence: f64) -> Self {
        Self {
            coverage_saturation: coverage_saturation.max(1),
            neutral_confidence: neutral_confidence.clamp(0.0, 100.0),
        }
    }

    pub fn from_settings(settings: &FusionSettings) -> Self {
        Self::new(settings.coverage_saturation, settings.neutral_confidence)
    }

    /// Score a cohort's fused fields
    ///
    /// Only fields that fused with data and carry a sensitivity in `schema`
    /// are scored, and only when at least two raw values are available.
    pub fn score(
        &self,
        schema: &FieldSchema,
        fields: &[FusedField],
        readings: &[&Reading],
        distinct_providers: usize,
    ) -> AgreementBreakdown {
        let mut field_scores = Vec::new();

        for fused in fields.iter().filter(|f| f.has_data()) {
            let Some(spec) = schema.get(&fused.name) else {
                continue;
            };
            let Some(k) = spec.sensitivity else {
                continue;
            };
            let Some(std_dev) = dispersion(&fused.name, spec.kind, readings) else {
                continue;
            };

            let score = penalized_score(std_dev, k);
            debug!(field = %fused.name, std_dev, k, score, "Field agreement");
            field_scores.push(SubScore {
                field: fused.name.clone(),
                std_dev,
                score,
            });
        }

        if field_scores.is_empty() {
            return AgreementBreakdown {
                field_scores,
                coverage: None,
                confidence: self.neutral_confidence,
            };
        }

        let coverage = self.coverage_score(distinct_providers);
        let total: f64 = field_scores.iter().map(|s| s.score).sum::<f64>() + coverage;
        let confidence = (total / (field_scores.len() + 1) as f64).clamp(0.0, 100.0);

        AgreementBreakdown {
            field_scores,
            coverage: Some(coverage),
            confidence,
        }
    }

    pub fn coverage_score(&self, distinct_providers: usize) -> f64 {
        (distinct_providers as f64 / self.coverage_saturation as f64 * 100.0).min(100.0)
    }
}

/// Spread of the raw values for one field; `None` below two values
fn dispersion(field: &str, kind: FieldKind, readings: &[&Reading]) -> Option<f64> {
    match kind {
        FieldKind::Scalar => sample_std_dev(&raw_values(field, readings, scalar::accept)),
        FieldKind::Angle => circular::circular_std_dev(
            &raw_values(field, readings, circular::accept_angle),
            CircularScale::Degrees,
        ),
        FieldKind::Clock => circular::circular_std_dev(
            &raw_values(field, readings, circular::accept_clock_minutes),
            CircularScale::Minutes,
        ),
        FieldKind::Label => None,
    }
}

/// Sample standard deviation (n - 1); `None` below two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// `max(0, 100 - std_dev × k)`; a zero `k` never penalizes
pub fn penalized_score(std_dev: f64, k: f64) -> f64 {
    if k == 0.0 {
        return 100.0;
    }
    let score = 100.0 - std_dev * k;
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}
