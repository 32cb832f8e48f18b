//! Per-category risk calculators.
//!
//! Each calculator turns one category's raw inputs into a normalized score
//! in [0, 1]. Calculators are pure and independent, so [`compute_all`] runs
//! the five of them in parallel and joins before anything is aggregated.

mod credit;
mod liquidity;
mod market;
mod operational;
mod systemic;

pub use credit::{CreditConfig, CreditRiskCalculator};
pub use liquidity::{LiquidityConfig, LiquidityRiskCalculator};
pub use market::MarketRiskCalculator;
pub use operational::OperationalRiskCalculator;
pub use systemic::{SystemicConfig, SystemicRiskCalculator};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigia_traits::{Result, VigiaError};

use crate::{RiskPolicy, category::RiskCategory, metrics::RiskInputBundle, metrics::RiskInputs};

/// Normalized score of one category for one analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskCategoryScore {
    /// Category scored
    pub category: RiskCategory,
    /// Inputs the score was computed from, when known
    pub raw_metrics: Option<RiskInputs>,
    /// Normalized score in [0, 1]
    pub normalized_score: f64,
    /// Policy weight of the category
    pub weight: f64,
    /// `normalized_score * weight`
    pub contribution: f64,
}

impl RiskCategoryScore {
    /// Score without raw inputs, as supplied by an external scorer.
    ///
    /// # Errors
    ///
    /// [`VigiaError::Range`] if the score or weight is outside [0, 1].
    pub fn from_score(category: RiskCategory, normalized_score: f64, weight: f64) -> Result<Self> {
        Self::build(category, None, normalized_score, weight)
    }

    fn build(
        category: RiskCategory,
        raw_metrics: Option<RiskInputs>,
        normalized_score: f64,
        weight: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&normalized_score) {
            return Err(VigiaError::Range(format!(
                "{category} score must lie in [0, 1], got {normalized_score}"
            )));
        }
        if !(0.0..=1.0).contains(&weight) {
            return Err(VigiaError::Range(format!(
                "{category} weight must lie in [0, 1], got {weight}"
            )));
        }
        Ok(Self {
            category,
            raw_metrics,
            normalized_score,
            weight,
            contribution: normalized_score * weight,
        })
    }

    /// Same score under a different policy weight.
    pub fn reweighted(&self, weight: f64) -> Result<Self> {
        Self::build(self.category, self.raw_metrics, self.normalized_score, weight)
    }
}

/// Scores one risk category.
///
/// Implementors provide [`normalize`](Self::normalize); the provided
/// [`compute`](Self::compute) checks that the inputs belong to the
/// calculator's category and wraps the result in a [`RiskCategoryScore`].
pub trait RiskCalculator: Send + Sync + std::fmt::Debug {
    /// Category this calculator scores.
    fn category(&self) -> RiskCategory;

    /// Map raw inputs to a score in [0, 1].
    ///
    /// # Errors
    ///
    /// [`VigiaError::OutOfRangeMetric`] for a negative or NaN metric, or a
    /// probability-like metric above one.
    fn normalize(&self, inputs: &RiskInputs) -> Result<f64>;

    /// Score `inputs` under the policy `weight`.
    fn compute(&self, inputs: &RiskInputs, weight: f64) -> Result<RiskCategoryScore> {
        if inputs.category() != self.category() {
            return Err(VigiaError::Validation(format!(
                "{} calculator received {} inputs",
                self.category(),
                inputs.category()
            )));
        }
        inputs.validate()?;
        let score = self.normalize(inputs)?;
        RiskCategoryScore::build(self.category(), Some(*inputs), score, weight)
    }
}

/// Tunable normalization parameters of the calculators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Liquidity normalization
    pub liquidity: LiquidityConfig,
    /// Credit normalization
    pub credit: CreditConfig,
    /// Systemic sub-score weights
    pub systemic: SystemicConfig,
}

impl CalculatorConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        self.liquidity.validate()?;
        self.credit.validate()?;
        self.systemic.validate()
    }

    /// One calculator per category, in canonical order.
    #[must_use]
    pub fn calculators(&self) -> Vec<Box<dyn RiskCalculator>> {
        vec![
            Box::new(MarketRiskCalculator),
            Box::new(LiquidityRiskCalculator::new(self.liquidity.clone())),
            Box::new(CreditRiskCalculator::new(self.credit.clone())),
            Box::new(OperationalRiskCalculator),
            Box::new(SystemicRiskCalculator::new(self.systemic.clone())),
        ]
    }
}

/// Score every category of `bundle` in parallel.
///
/// Scores come back in canonical category order. The first failing
/// calculator's error is returned and no partial result is produced.
pub fn compute_all(
    bundle: &RiskInputBundle,
    policy: &RiskPolicy,
    config: &CalculatorConfig,
) -> Result<Vec<RiskCategoryScore>> {
    config.validate()?;
    policy.validate()?;
    let inputs = bundle.inputs();
    let scores = config
        .calculators()
        .par_iter()
        .zip(inputs[..].par_iter())
        .map(|(calculator, raw)| calculator.compute(raw, policy.weight(calculator.category())))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        scores = ?scores.iter().map(|s| s.normalized_score).collect::<Vec<_>>(),
        "computed category risk scores"
    );
    Ok(scores)
}
