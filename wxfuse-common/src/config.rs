//! Configuration loading and config-file resolution
//!
//! All keys are optional. A missing config file is not an error: the compiled
//! defaults below apply and a warning is logged. A file that exists but does
//! not parse or validate is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WXFUSE_CONFIG";

/// Weight applied to providers missing from the weight table
pub const DEFAULT_PROVIDER_WEIGHT: f64 = 0.5;

/// Top-level TOML document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub fusion: FusionSettings,
    pub logging: LoggingConfig,
}

/// Fusion engine settings (`[fusion]` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FusionSettings {
    /// Minimum readings a cohort needs before it is fused
    pub min_sources: usize,

    /// Weight for providers not listed in `weights`
    pub default_weight: f64,

    /// Distinct-provider count at which the coverage sub-score reaches 100
    pub coverage_saturation: usize,

    /// Confidence reported when no dispersion sub-score can be computed
    pub neutral_confidence: f64,

    /// Keep only the earliest N hourly buckets (no limit when absent)
    pub hourly_horizon: Option<usize>,

    /// Provider identifier → reliability weight.
    ///
    /// A `[fusion.weights]` table in the file replaces this map entirely.
    pub weights: BTreeMap<String, f64>,

    /// Field name → agreement-scorer sensitivity override
    pub sensitivity: BTreeMap<String, f64>,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            min_sources: 2,
            default_weight: DEFAULT_PROVIDER_WEIGHT,
            coverage_saturation: 4,
            neutral_confidence: 50.0,
            hourly_horizon: None,
            weights: default_provider_weights(),
            sensitivity: BTreeMap::new(),
        }
    }
}

/// Reliability weights observed for the providers the collector ships with
pub fn default_provider_weights() -> BTreeMap<String, f64> {
    [
        ("open_meteo", 1.0),
        ("7timer", 0.85),
        ("openweather", 0.95),
        ("weatherapi", 0.90),
        ("openweathermap", 1.2),
        ("windy", 1.3),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect()
}

impl FusionSettings {
    /// Check ranges; logs a warning for weights below the default weight
    pub fn validate(&self) -> Result<()> {
        if self.min_sources == 0 {
            return Err(Error::Config("fusion.min_sources must be at least 1".to_string()));
        }
        if self.coverage_saturation == 0 {
            return Err(Error::Config(
                "fusion.coverage_saturation must be at least 1".to_string(),
            ));
        }
        if !self.default_weight.is_finite() || self.default_weight <= 0.0 {
            return Err(Error::Config(format!(
                "fusion.default_weight must be a positive number, got {}",
                self.default_weight
            )));
        }
        if !(0.0..=100.0).contains(&self.neutral_confidence) {
            return Err(Error::Config(format!(
                "fusion.neutral_confidence must be within [0, 100], got {}",
                self.neutral_confidence
            )));
        }
        if self.hourly_horizon == Some(0) {
            return Err(Error::Config(
                "fusion.hourly_horizon must be at least 1 when set".to_string(),
            ));
        }

        for (provider, weight) in &self.weights {
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(Error::Config(format!(
                    "weight for provider '{}' must be a positive number, got {}",
                    provider, weight
                )));
            }
            if *weight < self.default_weight {
                warn!(
                    provider = %provider,
                    weight = *weight,
                    default_weight = self.default_weight,
                    "Configured provider weight is below the default weight for unknown providers"
                );
            }
        }

        for (field, k) in &self.sensitivity {
            if !k.is_finite() || *k < 0.0 {
                return Err(Error::Config(format!(
                    "sensitivity for field '{}' must be a non-negative number, got {}",
                    field, k
                )));
            }
        }

        Ok(())
    }
}

/// Logging settings (`[logging]` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the effective configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// An existing config file
    File(PathBuf),
    /// A path was named explicitly but nothing exists there
    Missing(PathBuf),
    /// No path named and no default location exists
    Defaults,
}

/// Config-file resolution in priority order:
/// 1. Explicit path (command-line argument)
/// 2. `WXFUSE_CONFIG` environment variable
/// 3. User config directory (`<config_dir>/wxfuse/config.toml`)
/// 4. `/etc/wxfuse/config.toml` (Linux)
/// 5. None (compiled defaults)
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(explicit_path: Option<&Path>) -> Self {
        Self {
            explicit_path: explicit_path.map(Path::to_path_buf),
        }
    }

    /// Path of the config file that should be read, if any
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_locations().into_iter().find(|p| p.exists())
    }

    /// Resolve and check whether the resolved path exists
    pub fn source(&self) -> ConfigSource {
        match self.resolve() {
            Some(path) if path.exists() => ConfigSource::File(path),
            Some(path) => ConfigSource::Missing(path),
            None => ConfigSource::Defaults,
        }
    }

    /// Resolve and load, falling back to defaults when no file exists
    pub fn load(&self) -> Result<TomlConfig> {
        match self.source() {
            ConfigSource::File(path) => {
                info!(path = %path.display(), "Using config file");
                load_toml_config(&path)
            }
            ConfigSource::Missing(path) => {
                warn!(
                    path = %path.display(),
                    "Config file does not exist, using compiled defaults"
                );
                Ok(TomlConfig::default())
            }
            ConfigSource::Defaults => {
                info!("No config file found, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Read, parse and validate one config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    config.fusion.validate()?;
    debug!(
        path = %path.display(),
        providers = config.fusion.weights.len(),
        min_sources = config.fusion.min_sources,
        "Loaded config file"
    );
    Ok(config)
}

fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("wxfuse").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        locations.push(PathBuf::from("/etc/wxfuse/config.toml"));
    }
    locations
}
