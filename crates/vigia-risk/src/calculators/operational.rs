//! Operational risk.

use vigia_traits::{Result, VigiaError};

use super::RiskCalculator;
use crate::{category::RiskCategory, metrics::RiskInputs};

/// Operational risk calculator: mean of the four sub-scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationalRiskCalculator;

impl RiskCalculator for OperationalRiskCalculator {
    fn category(&self) -> RiskCategory {
        RiskCategory::Operational
    }

    fn normalize(&self, inputs: &RiskInputs) -> Result<f64> {
        let RiskInputs::Operational(m) = inputs else {
            return Err(VigiaError::Validation(format!(
                "expected operational inputs, got {}",
                inputs.category()
            )));
        };
        Ok((m.system_risk + m.human_risk + m.process_risk + m.external_risk) / 4.0)
    }
}
