//! Credit risk from default probability and counterparty exposure.

use serde::{Deserialize, Serialize};
use vigia_traits::{Result, VigiaError};

use super::RiskCalculator;
use crate::{category::RiskCategory, metrics::RiskInputs};

/// Configuration for credit normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditConfig {
    /// Multiplier on the default probability (default: 10, so a 10% PD
    /// saturates)
    pub default_probability_scale: f64,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            default_probability_scale: 10.0,
        }
    }
}

impl CreditConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        let scale = self.default_probability_scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(VigiaError::Validation(format!(
                "default_probability_scale must be positive, got {scale}"
            )));
        }
        Ok(())
    }
}

/// Credit risk calculator: mean of `min(1, pd * scale)` and the
/// counterparty risk score.
#[derive(Debug, Clone, Default)]
pub struct CreditRiskCalculator {
    config: CreditConfig,
}

impl CreditRiskCalculator {
    /// Create a new credit calculator.
    #[must_use]
    pub const fn new(config: CreditConfig) -> Self {
        Self { config }
    }
}

impl RiskCalculator for CreditRiskCalculator {
    fn category(&self) -> RiskCategory {
        RiskCategory::Credit
    }

    fn normalize(&self, inputs: &RiskInputs) -> Result<f64> {
        let RiskInputs::Credit(m) = inputs else {
            return Err(VigiaError::Validation(format!(
                "expected credit inputs, got {}",
                inputs.category()
            )));
        };
        let pd = (m.default_probability * self.config.default_probability_scale).min(1.0);
        Ok((pd + m.counterparty_risk) / 2.0)
    }
}
