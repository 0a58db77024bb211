// Field Schema - explicit, enumerated field list
//
// Each field declares its value kind (which fixes the combination rule) and an
// optional agreement-scorer sensitivity `k`. Fields without `k` are fused but
// contribute no dispersion sub-score.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use wxfuse_common::{Error, Result};

/// Value kind of a field; selects the fuser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Real number, weighted mean
    Scalar,
    /// Compass degrees, weighted circular mean (period 360)
    Angle,
    /// Time of day, weighted circular mean (period 1440 minutes)
    Clock,
    /// Text label, weighted plurality vote
    Label,
}

impl FieldKind {
    /// Whether cross-source dispersion can be measured for this kind
    pub fn has_dispersion(self) -> bool {
        !matches!(self, FieldKind::Label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Agreement-scorer sensitivity; penalty per unit of standard deviation
    pub sensitivity: Option<f64>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, sensitivity: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            sensitivity,
        }
    }

    pub fn scalar(name: &str, sensitivity: Option<f64>) -> Self {
        Self::new(name, FieldKind::Scalar, sensitivity)
    }

    pub fn angle(name: &str, sensitivity: Option<f64>) -> Self {
        Self::new(name, FieldKind::Angle, sensitivity)
    }

    pub fn clock(name: &str, sensitivity: Option<f64>) -> Self {
        Self::new(name, FieldKind::Clock, sensitivity)
    }

    pub fn label(name: &str) -> Self {
        Self::new(name, FieldKind::Label, None)
    }
}

/// Ordered list of fields fused for every cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Validate and build a schema
    ///
    /// Rejects duplicate names, sensitivities on label fields, and negative or
    /// non-finite sensitivities.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &fields {
            if spec.name.trim().is_empty() {
                return Err(Error::InvalidInput("field name must not be empty".to_string()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate field '{}' in schema",
                    spec.name
                )));
            }
            check_sensitivity(spec, spec.sensitivity)?;
        }
        Ok(Self { fields })
    }

    /// Daily summary fields
    pub fn daily() -> Self {
        Self {
            fields: vec![
                FieldSpec::scalar("temp_high", Some(10.0)),
                FieldSpec::scalar("temp_low", Some(10.0)),
                FieldSpec::scalar("wind_speed", Some(2.0)),
                FieldSpec::label("wind_direction"),
                FieldSpec::scalar("cloud_cover", Some(1.0)),
                FieldSpec::scalar("cloud_min_level", None),
                FieldSpec::scalar("freezing_altitude", None),
                FieldSpec::clock("sunrise", None),
                FieldSpec::clock("sunset", None),
                FieldSpec::clock("moonrise", None),
                FieldSpec::clock("moonset", None),
                FieldSpec::scalar("moon_illumination", None),
            ],
        }
    }

    /// Hourly series fields
    pub fn hourly() -> Self {
        Self {
            fields: vec![
                FieldSpec::scalar("temperature_c", Some(10.0)),
                FieldSpec::scalar("wind_speed_knots", Some(2.0)),
                FieldSpec::scalar("wind_gusts_knots", Some(2.0)),
                FieldSpec::angle("wind_direction_deg", Some(0.5)),
                FieldSpec::scalar("humidity_percent", Some(1.0)),
                FieldSpec::scalar("cloud_cover_percent", Some(1.0)),
                FieldSpec::scalar("visibility_km", None),
                FieldSpec::scalar("precipitation_mm", None),
                FieldSpec::scalar("dewpoint_c", None),
                FieldSpec::scalar("cloud_base_m", None),
                FieldSpec::scalar("freezing_altitude_m", None),
            ],
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace `k` for every named field present in this schema.
    ///
    /// Names absent from this schema are skipped; callers that need to reject
    /// unknown names check them against all schemas first.
    pub fn with_sensitivity_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Result<Self> {
        for spec in &mut self.fields {
            if let Some(k) = overrides.get(&spec.name) {
                check_sensitivity(spec, Some(*k))?;
                spec.sensitivity = Some(*k);
            }
        }
        Ok(self)
    }
}

fn check_sensitivity(spec: &FieldSpec, sensitivity: Option<f64>) -> Result<()> {
    let Some(k) = sensitivity else {
        return Ok(());
    };
    if !spec.kind.has_dispersion() {
        return Err(Error::InvalidInput(format!(
            "label field '{}' cannot carry a sensitivity",
            spec.name
        )));
    }
    if !k.is_finite() || k < 0.0 {
        return Err(Error::InvalidInput(format!(
            "sensitivity for '{}' must be a non-negative number, got {}",
            spec.name, k
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schemas_are_valid() {
        assert!(FieldSchema::new(FieldSchema::daily().fields().to_vec()).is_ok());
        assert!(FieldSchema::new(FieldSchema::hourly().fields().to_vec()).is_ok());
    }

    #[test]
    fn test_daily_schema_kinds() {
        let daily = FieldSchema::daily();
        assert_eq!(daily.get("wind_direction").map(|f| f.kind), Some(FieldKind::Label));
        assert_eq!(daily.get("moonrise").map(|f| f.kind), Some(FieldKind::Clock));
        assert_eq!(daily.get("temp_high").and_then(|f| f.sensitivity), Some(10.0));
        assert_eq!(daily.get("wind_speed").and_then(|f| f.sensitivity), Some(2.0));
        assert_eq!(daily.get("cloud_cover").and_then(|f| f.sensitivity), Some(1.0));
    }

    #[test]
    fn test_hourly_wind_direction_is_angle() {
        let hourly = FieldSchema::hourly();
        assert_eq!(hourly.get("wind_direction_deg").map(|f| f.kind), Some(FieldKind::Angle));
        assert!(!hourly.contains("sunrise"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = FieldSchema::new(vec![
            FieldSpec::scalar("wind_speed", None),
            FieldSpec::angle("wind_speed", None),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_label_sensitivity_rejected() {
        let spec = FieldSpec::new("wind_direction", FieldKind::Label, Some(1.0));
        assert!(FieldSchema::new(vec![spec]).is_err());
    }

    #[test]
    fn test_sensitivity_override_applies_to_present_fields() {
        let mut overrides = BTreeMap::new();
        overrides.insert("wind_speed".to_string(), 5.0);
        overrides.insert("temperature_c".to_string(), 3.0);

        let daily = FieldSchema::daily().with_sensitivity_overrides(&overrides).unwrap();
        assert_eq!(daily.get("wind_speed").and_then(|f| f.sensitivity), Some(5.0));
        assert!(!daily.contains("temperature_c"));
    }

    #[test]
    fn test_override_on_label_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("wind_direction".to_string(), 1.0);
        assert!(FieldSchema::daily().with_sensitivity_overrides(&overrides).is_err());
    }
}
