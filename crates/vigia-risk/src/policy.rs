//! Category weights and the cross-category correlation adjustment.

use serde::{Deserialize, Serialize};
use vigia_traits::{Result, VigiaError, stats};

use crate::category::RiskCategory;

/// Category weights of the aggregation policy.
///
/// Weights are non-negative and sum to one. The defaults follow a
/// Basel-style split that puts most of the weight on market and liquidity
/// risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Market weight (default: 0.35)
    pub market: f64,
    /// Liquidity weight (default: 0.25)
    pub liquidity: f64,
    /// Credit weight (default: 0.20)
    pub credit: f64,
    /// Operational weight (default: 0.15)
    pub operational: f64,
    /// Systemic weight (default: 0.05)
    pub systemic: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            market: 0.35,
            liquidity: 0.25,
            credit: 0.20,
            operational: 0.15,
            systemic: 0.05,
        }
    }
}

impl RiskPolicy {
    /// Create a validated policy.
    ///
    /// # Errors
    ///
    /// [`VigiaError::Validation`] if a weight is negative or the weights do
    /// not sum to one.
    pub fn new(
        market: f64,
        liquidity: f64,
        credit: f64,
        operational: f64,
        systemic: f64,
    ) -> Result<Self> {
        let policy = Self {
            market,
            liquidity,
            credit,
            operational,
            systemic,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check that the weights form a distribution.
    pub fn validate(&self) -> Result<()> {
        let weights = self.weights();
        if let Some((category, w)) = RiskCategory::ALL
            .iter()
            .zip(weights)
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(VigiaError::Validation(format!(
                "policy weight for {category} must be non-negative, got {w}"
            )));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > stats::SUM_TOLERANCE {
            return Err(VigiaError::Validation(format!(
                "policy weights must sum to 1.0, got {total}"
            )));
        }
        Ok(())
    }

    /// Weight of one category.
    #[must_use]
    pub const fn weight(&self, category: RiskCategory) -> f64 {
        match category {
            RiskCategory::Market => self.market,
            RiskCategory::Liquidity => self.liquidity,
            RiskCategory::Credit => self.credit,
            RiskCategory::Operational => self.operational,
            RiskCategory::Systemic => self.systemic,
        }
    }

    /// Weights in canonical category order.
    #[must_use]
    pub const fn weights(&self) -> [f64; 5] {
        [
            self.market,
            self.liquidity,
            self.credit,
            self.operational,
            self.systemic,
        ]
    }
}

/// Uplift applied to the weighted score for co-movement between categories.
///
/// The overall score is `weighted * (1 + adjustment)`, capped at one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrelationAdjustment {
    /// Fixed uplift
    Constant {
        /// Non-negative uplift
        value: f64,
    },
    /// Uplift derived from a category correlation matrix:
    /// `max_adjustment * max(0, Σ_{i<j} w_i w_j ρ_ij / Σ_{i<j} w_i w_j)`.
    ///
    /// Perfectly correlated categories get the full `max_adjustment`;
    /// uncorrelated or hedging categories get none.
    Matrix {
        /// Symmetric correlations in canonical category order, unit diagonal
        correlations: [[f64; 5]; 5],
        /// Uplift at perfect correlation
        max_adjustment: f64,
    },
}

impl Default for CorrelationAdjustment {
    fn default() -> Self {
        Self::Constant { value: 0.05 }
    }
}

impl CorrelationAdjustment {
    /// Check parameter ranges and matrix shape.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Constant { value } => non_negative_uplift("correlation adjustment", *value),
            Self::Matrix {
                correlations,
                max_adjustment,
            } => {
                non_negative_uplift("max_adjustment", *max_adjustment)?;
                for i in 0..5 {
                    if (correlations[i][i] - 1.0).abs() > stats::SUM_TOLERANCE {
                        return Err(VigiaError::Validation(format!(
                            "correlation diagonal must be 1, got {} for {}",
                            correlations[i][i],
                            RiskCategory::ALL[i]
                        )));
                    }
                    for j in 0..5 {
                        let rho = correlations[i][j];
                        if !(-1.0..=1.0).contains(&rho) {
                            return Err(VigiaError::Validation(format!(
                                "correlation ({i}, {j}) must lie in [-1, 1], got {rho}"
                            )));
                        }
                        if (rho - correlations[j][i]).abs() > stats::SUM_TOLERANCE {
                            return Err(VigiaError::Validation(format!(
                                "correlation matrix is not symmetric at ({i}, {j})"
                            )));
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Adjustment under `policy`. Always finite and non-negative for a
    /// validated configuration.
    #[must_use]
    pub fn factor(&self, policy: &RiskPolicy) -> f64 {
        match self {
            Self::Constant { value } => *value,
            Self::Matrix {
                correlations,
                max_adjustment,
            } => {
                let w = policy.weights();
                let (mut num, mut den) = (0.0, 0.0);
                for i in 0..5 {
                    for j in (i + 1)..5 {
                        let ww = w[i] * w[j];
                        num += ww * correlations[i][j];
                        den += ww;
                    }
                }
                if den < stats::EPSILON {
                    return 0.0;
                }
                max_adjustment * (num / den).max(0.0)
            }
        }
    }
}

fn non_negative_uplift(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(VigiaError::Validation(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform(rho: f64) -> [[f64; 5]; 5] {
        let mut m = [[rho; 5]; 5];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        m
    }

    #[test]
    fn test_default_policy_valid() {
        let policy = RiskPolicy::default();
        assert!(policy.validate().is_ok());
        assert_relative_eq!(policy.weight(RiskCategory::Credit), 0.20);
    }

    #[test]
    fn test_policy_must_sum_to_one() {
        assert!(RiskPolicy::new(0.5, 0.25, 0.2, 0.15, 0.05).is_err());
        assert!(RiskPolicy::new(-0.1, 0.45, 0.3, 0.3, 0.05).is_err());
        assert!(RiskPolicy::new(0.2, 0.2, 0.2, 0.2, 0.2).is_ok());
    }

    #[test]
    fn test_constant_adjustment() {
        let adj = CorrelationAdjustment::default();
        assert_relative_eq!(adj.factor(&RiskPolicy::default()), 0.05);
        assert!(
            CorrelationAdjustment::Constant { value: -0.1 }
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_matrix_adjustment() {
        let policy = RiskPolicy::default();
        let full = CorrelationAdjustment::Matrix {
            correlations: uniform(1.0),
            max_adjustment: 0.1,
        };
        assert_relative_eq!(full.factor(&policy), 0.1, epsilon = 1e-12);

        let half = CorrelationAdjustment::Matrix {
            correlations: uniform(0.5),
            max_adjustment: 0.1,
        };
        assert_relative_eq!(half.factor(&policy), 0.05, epsilon = 1e-12);

        let hedged = CorrelationAdjustment::Matrix {
            correlations: uniform(-0.2),
            max_adjustment: 0.1,
        };
        assert_relative_eq!(hedged.factor(&policy), 0.0);
    }

    #[test]
    fn test_matrix_validation() {
        let mut m = uniform(0.3);
        m[0][1] = 0.9;
        let asymmetric = CorrelationAdjustment::Matrix {
            correlations: m,
            max_adjustment: 0.1,
        };
        assert!(asymmetric.validate().is_err());

        let mut m = uniform(0.3);
        m[2][2] = 0.5;
        let bad_diagonal = CorrelationAdjustment::Matrix {
            correlations: m,
            max_adjustment: 0.1,
        };
        assert!(bad_diagonal.validate().is_err());
    }
}
