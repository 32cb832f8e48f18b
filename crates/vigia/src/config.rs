//! Top-level configuration loaded from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use vigia_ensemble::{AdapterConfig, CombinerConfig, EnsembleCombiner};
use vigia_risk::RiskConfig;
use vigia_traits::{LinearMetaModel, VigiaError, WeightBounds};

/// Error while loading a [`VigiaConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The values are out of range.
    #[error("Invalid config: {0}")]
    Invalid(#[from] VigiaError),
}

/// Every tunable of both pipelines. Missing fields take their defaults.
///
/// # Examples
///
/// ```rust
/// use vigia::VigiaConfig;
///
/// let config: VigiaConfig = serde_json::from_str(r#"{
///     "combiner": { "strategy": "majority_direction" },
///     "adapter": { "adaptation_rate": 0.2 }
/// }"#).unwrap();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VigiaConfig {
    /// Ensemble combination
    pub combiner: CombinerConfig,
    /// Weight adaptation
    pub adapter: AdapterConfig,
    /// Floor and ceiling of every ensemble weight
    pub bounds: WeightBounds,
    /// Maximum residuals kept for conformal uncertainty
    pub calibration_capacity: usize,
    /// Fitted meta-model for the stacking strategy
    pub meta_model: Option<LinearMetaModel>,
    /// Risk pipeline
    pub risk: RiskConfig,
}

impl Default for VigiaConfig {
    fn default() -> Self {
        Self {
            combiner: CombinerConfig::default(),
            adapter: AdapterConfig::default(),
            bounds: WeightBounds::default(),
            calibration_capacity: 500,
            meta_model: None,
            risk: RiskConfig::default(),
        }
    }
}

impl VigiaConfig {
    /// Check every section.
    pub fn validate(&self) -> vigia_traits::Result<()> {
        self.combiner.validate()?;
        self.adapter.validate()?;
        if self.calibration_capacity == 0 {
            return Err(VigiaError::Validation(
                "calibration_capacity must be at least 1".to_string(),
            ));
        }
        self.risk.validate()
    }

    /// Build the configured combiner, attaching the meta-model if present.
    pub fn build_combiner(&self) -> vigia_traits::Result<EnsembleCombiner> {
        let combiner = EnsembleCombiner::new(self.combiner.clone())?;
        Ok(match &self.meta_model {
            Some(model) => combiner.with_meta_model(Arc::new(model.clone())),
            None => combiner,
        })
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}
