//! # wxfuse Common Library
//!
//! Shared code for the wxfuse crates:
//! - Error type
//! - TOML configuration model and config-file resolution
//! - Clock-time value type

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::ClockTime;
