// Reliability Weight Table
//
// Provider → trust weight. Built once from configuration, read-only afterwards,
// so it can be shared across threads without synchronization.

use crate::fusion::{ProviderId, Weight};
use std::collections::HashMap;
use wxfuse_common::config::{default_provider_weights, FusionSettings, DEFAULT_PROVIDER_WEIGHT};
use wxfuse_common::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    weights: HashMap<ProviderId, Weight>,
    default_weight: Weight,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: default_provider_weights().into_iter().collect(),
            default_weight: DEFAULT_PROVIDER_WEIGHT,
        }
    }
}

impl WeightTable {
    /// Build a table; every weight (and the default) must be finite and positive
    pub fn new<I, S>(weights: I, default_weight: Weight) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Weight)>,
        S: Into<ProviderId>,
    {
        check_weight("default", default_weight)?;

        let mut table = HashMap::new();
        for (provider, weight) in weights {
            let provider = provider.into();
            check_weight(&provider, weight)?;
            table.insert(provider, weight);
        }

        Ok(Self {
            weights: table,
            default_weight,
        })
    }

    pub fn from_settings(settings: &FusionSettings) -> Result<Self> {
        Self::new(
            settings.weights.iter().map(|(p, w)| (p.clone(), *w)),
            settings.default_weight,
        )
    }

    /// Weight for a provider, falling back to the default weight
    pub fn weight_for(&self, provider: &str) -> Weight {
        self.weights
            .get(provider)
            .copied()
            .unwrap_or(self.default_weight)
    }

    pub fn default_weight(&self) -> Weight {
        self.default_weight
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

fn check_weight(provider: &str, weight: Weight) -> Result<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "weight for '{}' must be a positive number, got {}",
            provider, weight
        )))
    }
}
