//! Liquidity risk from spread and depth.

use serde::{Deserialize, Serialize};
use vigia_traits::{Result, VigiaError};

use super::RiskCalculator;
use crate::{category::RiskCategory, metrics::RiskInputs};

/// Configuration for liquidity normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityConfig {
    /// Multiplier turning a relative spread into a score (default: 100, so a
    /// 1% spread saturates)
    pub spread_scale: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            spread_scale: 100.0,
        }
    }
}

impl LiquidityConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.spread_scale.is_finite() && self.spread_scale > 0.0) {
            return Err(VigiaError::Validation(format!(
                "spread_scale must be positive, got {}",
                self.spread_scale
            )));
        }
        Ok(())
    }
}

/// Liquidity risk calculator.
///
/// Averages the scaled spread `min(1, spread * scale)` with the depth
/// shortfall `min(1, 1 / depth)`. An empty book (`depth = 0`) scores one.
#[derive(Debug, Clone, Default)]
pub struct LiquidityRiskCalculator {
    config: LiquidityConfig,
}

impl LiquidityRiskCalculator {
    /// Create a new liquidity calculator.
    #[must_use]
    pub const fn new(config: LiquidityConfig) -> Self {
        Self { config }
    }
}

impl RiskCalculator for LiquidityRiskCalculator {
    fn category(&self) -> RiskCategory {
        RiskCategory::Liquidity
    }

    fn normalize(&self, inputs: &RiskInputs) -> Result<f64> {
        let RiskInputs::Liquidity(m) = inputs else {
            return Err(VigiaError::Validation(format!(
                "expected liquidity inputs, got {}",
                inputs.category()
            )));
        };
        let spread = (m.bid_ask_spread * self.config.spread_scale).min(1.0);
        let depth = if m.market_depth > 0.0 {
            (1.0 / m.market_depth).min(1.0)
        } else {
            1.0
        };
        Ok((spread + depth) / 2.0)
    }
}
