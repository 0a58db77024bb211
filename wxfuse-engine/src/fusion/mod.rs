// Fusion Module - Multi-Source Consensus Engine
//
// Readings → Cohort Grouper → per-field Fusers → Agreement Scorer → FusedRecord
//
// Readings are immutable inputs; every type below is a data contract between
// the grouper, the fusers, the scorer and the orchestrator.

pub mod cohort;
pub mod engine;
pub mod fusers;
pub mod schema;
pub mod validators;
pub mod weights;

pub use cohort::{group_readings, CohortKey, Granularity};
pub use engine::FusionEngine;
pub use schema::{FieldKind, FieldSchema, FieldSpec};
pub use validators::agreement_scorer::{AgreementBreakdown, AgreementScorer};
pub use weights::WeightTable;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wxfuse_common::ClockTime;

/// Provider identifier (e.g. "open_meteo")
pub type ProviderId = String;

/// Reliability weight of a provider
pub type Weight = f64;

/// Raw value reported by a provider for one field
///
/// JSON numbers become `Number`, `"HH:MM"` strings become `Clock`, any other
/// string becomes `Text`. Everything else (booleans, arrays, objects) is kept
/// as `Raw` and treated as malformed; `null` is treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Clock(ClockTime),
    Text(String),
    Raw(serde_json::Value),
}

impl FieldValue {
    /// Finite numeric payload, if any
    pub fn as_finite_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, FieldValue::Raw(serde_json::Value::Null))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<ClockTime> for FieldValue {
    fn from(value: ClockTime) -> Self {
        FieldValue::Clock(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One provider's observation for one place and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub provider: ProviderId,
    pub place: String,
    pub observed_at: NaiveDateTime,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Reading {
    pub fn new(provider: &str, place: &str, observed_at: NaiveDateTime) -> Self {
        Self {
            provider: provider.to_string(),
            place: place.to_string(),
            observed_at,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Reported value for `name`; `None` when absent or null
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

/// Fused value for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FusedValue {
    Number(f64),
    Clock(ClockTime),
    Label(String),
}

/// One fused field with provenance counters
///
/// `contributors == 0` marks the no-data default, which callers must not
/// mistake for a genuine zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedField {
    pub name: String,
    pub kind: FieldKind,
    pub value: FusedValue,
    /// Readings whose value for this field was used
    pub contributors: usize,
    /// Sum of the contributors' weights
    pub total_weight: f64,
    /// Values present but rejected as malformed
    pub malformed: usize,
}

impl FusedField {
    /// No-data default for a field
    pub fn no_data(spec: &FieldSpec, malformed: usize) -> Self {
        let value = match spec.kind {
            FieldKind::Scalar | FieldKind::Angle => FusedValue::Number(0.0),
            FieldKind::Clock => FusedValue::Clock(ClockTime::MIDNIGHT),
            FieldKind::Label => {
                FusedValue::Label(fusers::categorical::UNKNOWN_LABEL.to_string())
            }
        };
        Self {
            name: spec.name.clone(),
            kind: spec.kind,
            value,
            contributors: 0,
            total_weight: 0.0,
            malformed,
        }
    }

    pub fn has_data(&self) -> bool {
        self.contributors > 0
    }
}

/// Engine output for one qualifying cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedRecord {
    pub place: String,
    /// Bucket start: midnight (daily) or top of the hour (hourly)
    pub bucket: NaiveDateTime,
    pub granularity: Granularity,
    /// One entry per schema field, in schema order
    pub fields: Vec<FusedField>,
    /// Agreement score in [0, 100]
    pub confidence: f64,
    pub agreement: AgreementBreakdown,
    /// Contributing providers, first-seen order, de-duplicated
    pub providers: Vec<ProviderId>,
    pub reading_count: usize,
}

impl FusedRecord {
    pub fn field(&self, name: &str) -> Option<&FusedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Numeric value of a scalar/angle field that has data
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.field(name)? {
            FusedField {
                value: FusedValue::Number(v),
                contributors,
                ..
            } if *contributors > 0 => Some(*v),
            _ => None,
        }
    }

    /// Clock value of a clock field that has data
    pub fn clock(&self, name: &str) -> Option<ClockTime> {
        match self.field(name)? {
            FusedField {
                value: FusedValue::Clock(t),
                contributors,
                ..
            } if *contributors > 0 => Some(*t),
            _ => None,
        }
    }

    /// Label of a label field that has data
    pub fn label(&self, name: &str) -> Option<&str> {
        match self.field(name)? {
            FusedField {
                value: FusedValue::Label(l),
                contributors,
                ..
            } if *contributors > 0 => Some(l.as_str()),
            _ => None,
        }
    }
}

/// Per-field numeric failure; degraded to no-data by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldFusionError {
    #[error("total weight for field '{field}' is not positive ({total_weight})")]
    NonPositiveWeight { field: String, total_weight: f64 },

    #[error("fused value for field '{field}' is not finite")]
    NonFinite { field: String },
}

/// A field that failed and was degraded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    pub field: String,
    pub error: FieldFusionError,
}

/// Why a cohort produced no record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Fewer readings than the minimum-source gate
    InsufficientSources { readings: usize, required: usize },
    /// The worker fusing this cohort did not complete
    Aborted { reason: String },
}

/// Result of fusing one cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CohortOutcome {
    Fused(FusedRecord),
    Partial {
        record: FusedRecord,
        failures: Vec<FieldFailure>,
    },
    Rejected {
        reason: Rejection,
    },
}

impl CohortOutcome {
    /// Record for fused and partial outcomes
    pub fn record(&self) -> Option<&FusedRecord> {
        match self {
            CohortOutcome::Fused(record) | CohortOutcome::Partial { record, .. } => Some(record),
            CohortOutcome::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, CohortOutcome::Rejected { .. })
    }
}

/// Outcome for one cohort key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortReport {
    pub key: CohortKey,
    pub outcome: CohortOutcome,
}

/// Outcomes for a whole batch, sorted by (bucket, place)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionReport {
    pub granularity: Granularity,
    pub cohorts: Vec<CohortReport>,
}

impl FusionReport {
    /// Fused and partial records in time order
    pub fn records(&self) -> impl Iterator<Item = &FusedRecord> {
        self.cohorts.iter().filter_map(|c| c.outcome.record())
    }

    pub fn rejections(&self) -> impl Iterator<Item = (&CohortKey, &Rejection)> {
        self.cohorts.iter().filter_map(|c| match &c.outcome {
            CohortOutcome::Rejected { reason } => Some((&c.key, reason)),
            _ => None,
        })
    }

    pub fn outcome(&self, key: &CohortKey) -> Option<&CohortOutcome> {
        self.cohorts
            .iter()
            .find(|c| &c.key == key)
            .map(|c| &c.outcome)
    }

    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_field_value_json_shapes() {
        let json = r#"{
            "provider": "open_meteo",
            "place": "Tel Aviv",
            "observed_at": "2025-03-14T12:00:00",
            "fields": {
                "temp_high": 21.5,
                "sunrise": "05:48",
                "wind_direction": "NW",
                "cloud_cover": null,
                "moon_illumination": true
            }
        }"#;
        let reading: Reading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.value("temp_high"), Some(&FieldValue::Number(21.5)));
        assert_eq!(
            reading.value("sunrise"),
            Some(&FieldValue::Clock(ClockTime::from_hm(5, 48).unwrap()))
        );
        assert_eq!(
            reading.value("wind_direction"),
            Some(&FieldValue::Text("NW".to_string()))
        );
        assert_eq!(reading.value("cloud_cover"), None);
        assert_eq!(
            reading.value("moon_illumination"),
            Some(&FieldValue::Raw(serde_json::Value::Bool(true)))
        );
    }

    #[test]
    fn test_invalid_clock_string_is_text() {
        let value: FieldValue = serde_json::from_str("\"25:61\"").unwrap();
        assert_eq!(value, FieldValue::Text("25:61".to_string()));
    }

    #[test]
    fn test_reading_builder() {
        let reading = Reading::new("windy", "Haifa", noon())
            .with_field("wind_speed", 12.0)
            .with_field("wind_direction", "SW");
        assert_eq!(reading.provider, "windy");
        assert_eq!(reading.fields.len(), 2);
        assert!(reading.value("temp_low").is_none());
    }

    #[test]
    fn test_non_finite_number_not_accepted() {
        assert_eq!(FieldValue::Number(f64::NAN).as_finite_number(), None);
        assert_eq!(FieldValue::Number(f64::INFINITY).as_finite_number(), None);
        assert_eq!(FieldValue::Text("12".into()).as_finite_number(), None);
        assert_eq!(FieldValue::Number(-3.5).as_finite_number(), Some(-3.5));
    }
}
