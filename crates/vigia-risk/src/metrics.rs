//! Raw per-category risk inputs supplied by the metrics pipeline.
//!
//! Every input type validates its own ranges; calculators call
//! `validate()` before normalizing, so a bad metric never reaches the
//! aggregator.

use serde::{Deserialize, Serialize};
use vigia_traits::{Result, VigiaError};

use crate::category::RiskCategory;

fn non_negative(metric: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(VigiaError::out_of_range(metric, value))
    }
}

fn unit(metric: &str, value: f64) -> Result<f64> {
    let value = non_negative(metric, value)?;
    if value > 1.0 {
        return Err(VigiaError::out_of_range(metric, value));
    }
    Ok(value)
}

/// Market risk inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    /// Value-at-risk as a fraction of portfolio value
    pub var_fraction: f64,
}

impl MarketMetrics {
    /// Check metric ranges.
    pub fn validate(&self) -> Result<()> {
        unit("var_fraction", self.var_fraction)?;
        Ok(())
    }
}

/// Liquidity risk inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    /// Relative bid-ask spread (0.01 = 1%)
    pub bid_ask_spread: f64,
    /// Order book depth as a multiple of normal depth (1 = normal)
    pub market_depth: f64,
}

impl LiquidityMetrics {
    /// Check metric ranges.
    pub fn validate(&self) -> Result<()> {
        non_negative("bid_ask_spread", self.bid_ask_spread)?;
        non_negative("market_depth", self.market_depth)?;
        Ok(())
    }
}

/// Credit risk inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditMetrics {
    /// Probability of counterparty default over the horizon
    pub default_probability: f64,
    /// Counterparty risk score in [0, 1]
    pub counterparty_risk: f64,
}

impl CreditMetrics {
    /// Check metric ranges.
    pub fn validate(&self) -> Result<()> {
        unit("default_probability", self.default_probability)?;
        unit("counterparty_risk", self.counterparty_risk)?;
        Ok(())
    }
}

/// Operational risk inputs, each a sub-score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationalMetrics {
    /// Infrastructure failures
    pub system_risk: f64,
    /// Human error
    pub human_risk: f64,
    /// Process breakdown
    pub process_risk: f64,
    /// External events
    pub external_risk: f64,
}

impl OperationalMetrics {
    /// Check metric ranges.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.named() {
            unit(name, value)?;
        }
        Ok(())
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("system_risk", self.system_risk),
            ("human_risk", self.human_risk),
            ("process_risk", self.process_risk),
            ("external_risk", self.external_risk),
        ]
    }
}

/// Systemic risk inputs, each a sub-score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemicMetrics {
    /// Spillover from distressed institutions
    pub contagion: f64,
    /// Self-reinforcing liquidity withdrawal
    pub liquidity_spiral: f64,
    /// Forced selling pressure
    pub fire_sales: f64,
    /// Interconnectedness
    pub network: f64,
}

impl SystemicMetrics {
    /// Check metric ranges.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.named() {
            unit(name, value)?;
        }
        Ok(())
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("contagion", self.contagion),
            ("liquidity_spiral", self.liquidity_spiral),
            ("fire_sales", self.fire_sales),
            ("network", self.network),
        ]
    }
}

/// Raw inputs of one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum RiskInputs {
    /// Market inputs
    Market(MarketMetrics),
    /// Liquidity inputs
    Liquidity(LiquidityMetrics),
    /// Credit inputs
    Credit(CreditMetrics),
    /// Operational inputs
    Operational(OperationalMetrics),
    /// Systemic inputs
    Systemic(SystemicMetrics),
}

impl RiskInputs {
    /// Category these inputs belong to.
    #[must_use]
    pub const fn category(&self) -> RiskCategory {
        match self {
            Self::Market(_) => RiskCategory::Market,
            Self::Liquidity(_) => RiskCategory::Liquidity,
            Self::Credit(_) => RiskCategory::Credit,
            Self::Operational(_) => RiskCategory::Operational,
            Self::Systemic(_) => RiskCategory::Systemic,
        }
    }

    /// Check metric ranges.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Market(m) => m.validate(),
            Self::Liquidity(m) => m.validate(),
            Self::Credit(m) => m.validate(),
            Self::Operational(m) => m.validate(),
            Self::Systemic(m) => m.validate(),
        }
    }

    /// Every raw metric as `(name, value)`.
    #[must_use]
    pub fn metrics(&self) -> Vec<(&'static str, f64)> {
        match self {
            Self::Market(m) => vec![("var_fraction", m.var_fraction)],
            Self::Liquidity(m) => vec![
                ("bid_ask_spread", m.bid_ask_spread),
                ("market_depth", m.market_depth),
            ],
            Self::Credit(m) => vec![
                ("default_probability", m.default_probability),
                ("counterparty_risk", m.counterparty_risk),
            ],
            Self::Operational(m) => m.named().to_vec(),
            Self::Systemic(m) => m.named().to_vec(),
        }
    }

    /// Names of the raw metrics reported for `category`, in the order of
    /// [`Self::metrics`].
    #[must_use]
    pub const fn metric_names(category: RiskCategory) -> &'static [&'static str] {
        match category {
            RiskCategory::Market => &["var_fraction"],
            RiskCategory::Liquidity => &["bid_ask_spread", "market_depth"],
            RiskCategory::Credit => &["default_probability", "counterparty_risk"],
            RiskCategory::Operational => {
                &["system_risk", "human_risk", "process_risk", "external_risk"]
            }
            RiskCategory::Systemic => &["contagion", "liquidity_spiral", "fire_sales", "network"],
        }
    }

    /// Look up one raw metric by name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics()
            .into_iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }
}

/// Raw inputs for all five categories of one analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskInputBundle {
    /// Market inputs
    pub market: MarketMetrics,
    /// Liquidity inputs
    pub liquidity: LiquidityMetrics,
    /// Credit inputs
    pub credit: CreditMetrics,
    /// Operational inputs
    pub operational: OperationalMetrics,
    /// Systemic inputs
    pub systemic: SystemicMetrics,
}

impl RiskInputBundle {
    /// Per-category inputs in canonical category order.
    #[must_use]
    pub const fn inputs(&self) -> [RiskInputs; 5] {
        [
            RiskInputs::Market(self.market),
            RiskInputs::Liquidity(self.liquidity),
            RiskInputs::Credit(self.credit),
            RiskInputs::Operational(self.operational),
            RiskInputs::Systemic(self.systemic),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_above_one_rejected() {
        let credit = CreditMetrics {
            default_probability: 1.2,
            counterparty_risk: 0.1,
        };
        let err = credit.validate().unwrap_err();
        assert!(matches!(
            err,
            VigiaError::OutOfRangeMetric { ref metric, .. } if metric == "default_probability"
        ));
    }

    #[test]
    fn test_negative_and_nan_rejected() {
        let liquidity = LiquidityMetrics {
            bid_ask_spread: -0.01,
            market_depth: 1.0,
        };
        assert!(liquidity.validate().is_err());

        let market = MarketMetrics {
            var_fraction: f64::NAN,
        };
        assert!(market.validate().is_err());
    }

    #[test]
    fn test_spread_may_exceed_one() {
        let liquidity = LiquidityMetrics {
            bid_ask_spread: 2.0,
            market_depth: 0.0,
        };
        assert!(liquidity.validate().is_ok());
    }

    #[test]
    fn test_metric_lookup() {
        let inputs = RiskInputs::Credit(CreditMetrics {
            default_probability: 0.07,
            counterparty_risk: 0.2,
        });
        assert_eq!(inputs.category(), RiskCategory::Credit);
        assert_eq!(inputs.metric("default_probability"), Some(0.07));
        assert_eq!(inputs.metric("contagion"), None);
    }

    #[test]
    fn test_metric_names_match_reported_metrics() {
        let bundle = RiskInputBundle {
            market: MarketMetrics { var_fraction: 0.1 },
            liquidity: LiquidityMetrics {
                bid_ask_spread: 0.01,
                market_depth: 1.0,
            },
            credit: CreditMetrics {
                default_probability: 0.01,
                counterparty_risk: 0.1,
            },
            operational: OperationalMetrics {
                system_risk: 0.1,
                human_risk: 0.1,
                process_risk: 0.1,
                external_risk: 0.1,
            },
            systemic: SystemicMetrics {
                contagion: 0.1,
                liquidity_spiral: 0.1,
                fire_sales: 0.1,
                network: 0.1,
            },
        };
        for inputs in bundle.inputs() {
            let reported: Vec<_> = inputs.metrics().into_iter().map(|(n, _)| n).collect();
            assert_eq!(reported, RiskInputs::metric_names(inputs.category()));
        }
    }

        #[test]
    fn test_inputs_serde_tagged() {
        let inputs = RiskInputs::Market(MarketMetrics { var_fraction: 0.4 });
        let json = serde_json::to_string(&inputs).unwrap();
        assert_eq!(json, r#"{"category":"market","var_fraction":0.4}"#);
        let back: RiskInputs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inputs);
    }
}
