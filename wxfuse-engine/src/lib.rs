//! wxfuse-engine - multi-source weather reading fusion
//!
//! Groups per-provider readings into (place, time bucket) cohorts, fuses each
//! field with a rule matching its value kind, and scores how closely the
//! providers agree.
//!
//! ```no_run
//! use wxfuse_engine::{FusionEngine, Granularity, Reading};
//! use wxfuse_common::config::FusionSettings;
//!
//! # fn demo(readings: Vec<Reading>) -> wxfuse_common::Result<()> {
//! let engine = FusionEngine::new(&FusionSettings::default())?;
//! let report = engine.fuse(&readings, Granularity::Daily);
//! for record in report.records() {
//!     println!("{} {} confidence {:.0}", record.place, record.bucket, record.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod fusion;

pub use fusion::{
    CohortKey, CohortOutcome, FieldKind, FieldSchema, FieldSpec, FieldValue, FusedField,
    FusedRecord, FusedValue, FusionEngine, FusionReport, Granularity, Reading, Rejection,
    WeightTable,
};
