//! Market risk from value-at-risk.

use vigia_traits::{Result, VigiaError};

use super::RiskCalculator;
use crate::{category::RiskCategory, metrics::RiskInputs};

/// Market risk calculator.
///
/// The VaR fraction is already a loss share of portfolio value, so it is
/// used as the score directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketRiskCalculator;

impl RiskCalculator for MarketRiskCalculator {
    fn category(&self) -> RiskCategory {
        RiskCategory::Market
    }

    fn normalize(&self, inputs: &RiskInputs) -> Result<f64> {
        match inputs {
            RiskInputs::Market(m) => Ok(m.var_fraction),
            other => Err(VigiaError::Validation(format!(
                "expected market inputs, got {}",
                other.category()
            ))),
        }
    }
}
