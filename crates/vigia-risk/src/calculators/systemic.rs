//! Systemic risk.

use serde::{Deserialize, Serialize};
use vigia_traits::{Result, VigiaError, stats};

use super::RiskCalculator;
use crate::{category::RiskCategory, metrics::RiskInputs};

/// Sub-score weights of the systemic calculator. Must sum to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemicConfig {
    /// Weight of contagion (default: 0.4)
    pub contagion: f64,
    /// Weight of the liquidity spiral (default: 0.3)
    pub liquidity_spiral: f64,
    /// Weight of fire sales (default: 0.2)
    pub fire_sales: f64,
    /// Weight of network effects (default: 0.1)
    pub network: f64,
}

impl Default for SystemicConfig {
    fn default() -> Self {
        Self {
            contagion: 0.4,
            liquidity_spiral: 0.3,
            fire_sales: 0.2,
            network: 0.1,
        }
    }
}

impl SystemicConfig {
    /// Check that the weights are non-negative and sum to one.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.contagion,
            self.liquidity_spiral,
            self.fire_sales,
            self.network,
        ];
        let total: f64 = weights.iter().sum();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0)
            || (total - 1.0).abs() > stats::SUM_TOLERANCE
        {
            return Err(VigiaError::Validation(format!(
                "systemic weights must be non-negative and sum to 1, got {weights:?}"
            )));
        }
        Ok(())
    }
}

/// Systemic risk calculator: weighted sum of the four sub-scores.
#[derive(Debug, Clone, Default)]
pub struct SystemicRiskCalculator {
    config: SystemicConfig,
}

impl SystemicRiskCalculator {
    /// Create a new systemic calculator.
    #[must_use]
    pub const fn new(config: SystemicConfig) -> Self {
        Self { config }
    }
}

impl RiskCalculator for SystemicRiskCalculator {
    fn category(&self) -> RiskCategory {
        RiskCategory::Systemic
    }

    fn normalize(&self, inputs: &RiskInputs) -> Result<f64> {
        let RiskInputs::Systemic(m) = inputs else {
            return Err(VigiaError::Validation(format!(
                "expected systemic inputs, got {}",
                inputs.category()
            )));
        };
        let c = &self.config;
        let score = c.contagion * m.contagion
            + c.liquidity_spiral * m.liquidity_spiral
            + c.fire_sales * m.fire_sales
            + c.network * m.network;
        // weights sum to one within tolerance
        Ok(stats::unit_clamp(score))
    }
}
