// Fusion Engine - Cohort Orchestrator
//
// Holds only immutable configuration (weight table, scorer settings, schemas),
// so one instance can be shared across threads behind an Arc.
//
// Per cohort:
// 1. Minimum-source gate (reading count)
// 2. Per-field dispatch by FieldKind to the scalar / circular / categorical fuser
// 3. Field failures degrade to no-data and make the outcome Partial
// 4. Agreement scoring over the successfully fused fields

use crate::fusion::fusers::{categorical, circular, scalar, FieldEstimate};
use crate::fusion::{
    group_readings, AgreementScorer, CohortKey, CohortOutcome, CohortReport, FieldFailure,
    FieldFusionError, FieldKind, FieldSchema, FieldSpec, FusedField, FusedRecord, FusedValue,
    FusionReport, Granularity, ProviderId, Reading, Rejection, WeightTable,
};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wxfuse_common::config::FusionSettings;
use wxfuse_common::{Error, Result};

#[derive(Debug, Clone)]
pub struct FusionEngine {
    weights: WeightTable,
    scorer: AgreementScorer,
    min_sources: usize,
    hourly_horizon: Option<usize>,
    daily_schema: FieldSchema,
    hourly_schema: FieldSchema,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            scorer: AgreementScorer::default(),
            min_sources: FusionSettings::default().min_sources,
            hourly_horizon: None,
            daily_schema: FieldSchema::daily(),
            hourly_schema: FieldSchema::hourly(),
        }
    }
}

impl FusionEngine {
    /// Build an engine from validated settings
    ///
    /// Sensitivity overrides must name a non-label field of the daily or
    /// hourly schema.
    pub fn new(settings: &FusionSettings) -> Result<Self> {
        settings.validate()?;

        let daily = FieldSchema::daily();
        let hourly = FieldSchema::hourly();
        for field in settings.sensitivity.keys() {
            let spec = daily.get(field).or_else(|| hourly.get(field)).ok_or_else(|| {
                Error::Config(format!("sensitivity override for unknown field '{}'", field))
            })?;
            if !spec.kind.has_dispersion() {
                return Err(Error::Config(format!(
                    "sensitivity override for label field '{}' is not allowed",
                    field
                )));
            }
        }

        let engine = Self {
            weights: WeightTable::from_settings(settings)?,
            scorer: AgreementScorer::from_settings(settings),
            min_sources: settings.min_sources,
            hourly_horizon: settings.hourly_horizon,
            daily_schema: daily.with_sensitivity_overrides(&settings.sensitivity)?,
            hourly_schema: hourly.with_sensitivity_overrides(&settings.sensitivity)?,
        };

        debug!(
            providers = engine.weights.len(),
            min_sources = engine.min_sources,
            overrides = settings.sensitivity.len(),
            "Fusion engine configured"
        );
        Ok(engine)
    }

    /// Built-in schema (with overrides applied) for a granularity
    pub fn schema(&self, granularity: Granularity) -> &FieldSchema {
        match granularity {
            Granularity::Daily => &self.daily_schema,
            Granularity::Hourly => &self.hourly_schema,
        }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn min_sources(&self) -> usize {
        self.min_sources
    }

    /// Fuse a batch with the built-in schema for `granularity`
    pub fn fuse(&self, readings: &[Reading], granularity: Granularity) -> FusionReport {
        self.fuse_with_schema(readings, granularity, self.schema(granularity))
    }

    /// Fuse a batch with an explicit field schema
    pub fn fuse_with_schema(
        &self,
        readings: &[Reading],
        granularity: Granularity,
        schema: &FieldSchema,
    ) -> FusionReport {
        let groups = self.within_horizon(group_readings(readings, granularity), granularity);

        let cohorts: Vec<CohortReport> = groups
            .into_iter()
            .map(|(key, members)| {
                let outcome = self.fuse_cohort(&key, &members, schema, granularity);
                CohortReport { key, outcome }
            })
            .collect();

        let report = FusionReport {
            granularity,
            cohorts,
        };
        log_summary(&report);
        report
    }

    /// Fuse one cohort
    pub fn fuse_cohort(
        &self,
        key: &CohortKey,
        readings: &[&Reading],
        schema: &FieldSchema,
        granularity: Granularity,
    ) -> CohortOutcome {
        if readings.len() < self.min_sources {
            debug!(
                cohort = %key,
                readings = readings.len(),
                required = self.min_sources,
                "Cohort below minimum-source gate"
            );
            return CohortOutcome::Rejected {
                reason: Rejection::InsufficientSources {
                    readings: readings.len(),
                    required: self.min_sources,
                },
            };
        }

        let mut fields = Vec::with_capacity(schema.len());
        let mut failures = Vec::new();

        for spec in schema.fields() {
            match self.fuse_field(spec, readings) {
                Ok(field) => fields.push(field),
                Err(error) => {
                    warn!(
                        cohort = %key,
                        field = %spec.name,
                        error = %error,
                        "Field fusion failed; reporting no data for this field"
                    );
                    fields.push(FusedField::no_data(spec, 0));
                    failures.push(FieldFailure {
                        field: spec.name.clone(),
                        error,
                    });
                }
            }
        }

        let providers = distinct_providers(readings);
        let agreement = self.scorer.score(schema, &fields, readings, providers.len());

        let record = FusedRecord {
            place: key.place.clone(),
            bucket: key.bucket,
            granularity,
            fields,
            confidence: agreement.confidence,
            agreement,
            providers,
            reading_count: readings.len(),
        };

        if failures.is_empty() {
            CohortOutcome::Fused(record)
        } else {
            CohortOutcome::Partial { record, failures }
        }
    }

    /// Fuse cohorts on the blocking pool, at most `workers` at a time
    ///
    /// Produces the same report as [`FusionEngine::fuse`]. A cohort whose
    /// worker panics is reported as `Rejection::Aborted`.
    pub async fn fuse_concurrent(
        self: Arc<Self>,
        readings: Vec<Reading>,
        granularity: Granularity,
        workers: usize,
    ) -> FusionReport {
        let schema = Arc::new(self.schema(granularity).clone());

        // Owned cohorts so each worker can move its share
        let cohorts: Vec<(CohortKey, Vec<Reading>)> = self
            .within_horizon(group_readings(&readings, granularity), granularity)
            .into_iter()
            .map(|(key, members)| (key, members.into_iter().cloned().collect()))
            .collect();

        info!(
            cohorts = cohorts.len(),
            workers = workers.max(1),
            granularity = %granularity,
            "Fusing cohorts concurrently"
        );

        let mut reports: Vec<CohortReport> = stream::iter(cohorts)
            .map(|(key, members)| {
                let engine = Arc::clone(&self);
                let schema = Arc::clone(&schema);
                async move {
                    let task_key = key.clone();
                    let joined = tokio::task::spawn_blocking(move || {
                        let refs: Vec<&Reading> = members.iter().collect();
                        engine.fuse_cohort(&task_key, &refs, &schema, granularity)
                    })
                    .await;

                    let outcome = joined.unwrap_or_else(|e| {
                        warn!(cohort = %key, error = %e, "Cohort worker did not complete");
                        CohortOutcome::Rejected {
                            reason: Rejection::Aborted {
                                reason: e.to_string(),
                            },
                        }
                    });
                    CohortReport { key, outcome }
                }
            })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;

        reports.sort_by(|a, b| a.key.cmp(&b.key));

        let report = FusionReport {
            granularity,
            cohorts: reports,
        };
        log_summary(&report);
        report
    }

    fn fuse_field(
        &self,
        spec: &FieldSpec,
        readings: &[&Reading],
    ) -> std::result::Result<FusedField, FieldFusionError> {
        let name = spec.name.as_str();
        let field = match spec.kind {
            FieldKind::Scalar => into_field(
                spec,
                scalar::fuse_scalar(name, readings, &self.weights)?,
                FusedValue::Number,
            ),
            FieldKind::Angle => into_field(
                spec,
                circular::fuse_angle(name, readings, &self.weights)?,
                FusedValue::Number,
            ),
            FieldKind::Clock => into_field(
                spec,
                circular::fuse_clock(name, readings, &self.weights)?,
                FusedValue::Clock,
            ),
            FieldKind::Label => into_field(
                spec,
                categorical::fuse_label(name, readings, &self.weights),
                FusedValue::Label,
            ),
        };
        Ok(field)
    }

    /// Drop hourly buckets past the configured horizon
    fn within_horizon<'a>(
        &self,
        groups: BTreeMap<CohortKey, Vec<&'a Reading>>,
        granularity: Granularity,
    ) -> BTreeMap<CohortKey, Vec<&'a Reading>> {
        let Some(limit) = self.hourly_horizon.filter(|_| granularity == Granularity::Hourly) else {
            return groups;
        };

        // Keys iterate bucket-first, so the earliest buckets come first
        let mut seen = 0;
        let mut last_bucket = None;
        groups
            .into_iter()
            .take_while(|(key, _)| {
                if last_bucket != Some(key.bucket) {
                    last_bucket = Some(key.bucket);
                    seen += 1;
                }
                seen <= limit
            })
            .collect()
    }
}

fn into_field<T>(
    spec: &FieldSpec,
    estimate: FieldEstimate<T>,
    wrap: fn(T) -> FusedValue,
) -> FusedField {
    if estimate.contributors == 0 {
        return FusedField::no_data(spec, estimate.malformed);
    }
    FusedField {
        name: spec.name.clone(),
        kind: spec.kind,
        value: wrap(estimate.value),
        contributors: estimate.contributors,
        total_weight: estimate.total_weight,
        malformed: estimate.malformed,
    }
}

/// Provider ids in first-seen order, without repeats
fn distinct_providers(readings: &[&Reading]) -> Vec<ProviderId> {
    let mut providers: Vec<ProviderId> = Vec::new();
    for reading in readings {
        if !providers.contains(&reading.provider) {
            providers.push(reading.provider.clone());
        }
    }
    providers
}

fn log_summary(report: &FusionReport) {
    let mut fused = 0;
    let mut partial = 0;
    let mut rejected = 0;
    for cohort in &report.cohorts {
        match cohort.outcome {
            CohortOutcome::Fused(_) => fused += 1,
            CohortOutcome::Partial { .. } => partial += 1,
            CohortOutcome::Rejected { .. } => rejected += 1,
        }
    }
    info!(
        granularity = %report.granularity,
        cohorts = report.len(),
        fused,
        partial,
        rejected,
        "Fusion batch complete"
    );
}
