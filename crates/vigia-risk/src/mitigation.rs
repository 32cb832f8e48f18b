//! Rule-based mitigation recommendations.

use serde::{Deserialize, Serialize};
use vigia_traits::{Result, VigiaError};

use crate::{
    calculators::RiskCategoryScore,
    category::{RiskCategory, Timeframe},
    metrics::RiskInputs,
};

/// Kind of mitigating action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum MitigationStrategy {
    /// Spread exposure across uncorrelated positions
    #[display("diversification")]
    Diversification,
    /// Offset exposure with derivatives
    #[display("hedging")]
    Hedging,
    /// Hold cash or liquid assets against exits
    #[display("liquidity_buffer")]
    LiquidityBuffer,
    /// Require or top up collateral
    #[display("collateral_management")]
    CollateralManagement,
    /// Cap exposure per counterparty
    #[display("exposure_limits")]
    ExposureLimits,
    /// Tighten operating procedures
    #[display("process_controls")]
    ProcessControls,
    /// Buy protection against extreme moves
    #[display("tail_hedging")]
    TailHedging,
}

/// Urgency of a mitigation. Ordered, so `Critical > Low`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait
    #[display("low")]
    Low,
    /// Schedule soon
    #[display("medium")]
    Medium,
    /// Act this cycle
    #[display("high")]
    High,
    /// Act now
    #[display("critical")]
    Critical,
}

/// Condition under which a rule fires. Thresholds are strict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "on", rename_all = "snake_case")]
pub enum Trigger {
    /// The category's normalized score exceeds `threshold`
    Score {
        /// Score threshold
        threshold: f64,
    },
    /// A named raw metric of the category exceeds `threshold`
    Metric {
        /// Raw metric name, e.g. `default_probability`
        metric: String,
        /// Metric threshold
        threshold: f64,
    },
}

impl Trigger {
    /// Value the trigger compares against its threshold, if available.
    fn observed(&self, score: &RiskCategoryScore) -> Option<f64> {
        match self {
            Self::Score { .. } => Some(score.normalized_score),
            Self::Metric { metric, .. } => score.raw_metrics.and_then(|m| m.metric(metric)),
        }
    }

    const fn threshold(&self) -> f64 {
        match self {
            Self::Score { threshold } | Self::Metric { threshold, .. } => *threshold,
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationRule {
    /// Category the rule watches
    pub category: RiskCategory,
    /// Firing condition
    pub trigger: Trigger,
    /// Recommended action
    pub strategy: MitigationStrategy,
    /// Urgency
    pub priority: Priority,
    /// Expected risk reduction in [0, 1]
    pub effectiveness: f64,
    /// Relative cost in [0, 1]
    pub cost: f64,
    /// When the action takes effect
    pub timeframe: Timeframe,
    /// Human-readable recommendation
    pub description: String,
}

impl MitigationRule {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.effectiveness) || !(0.0..=1.0).contains(&self.cost) {
            return Err(VigiaError::Validation(format!(
                "{} rule: effectiveness and cost must lie in [0, 1]",
                self.strategy
            )));
        }
        if !self.trigger.threshold().is_finite() {
            return Err(VigiaError::Validation(format!(
                "{} rule: trigger threshold must be finite",
                self.strategy
            )));
        }
        if let Trigger::Metric { metric, .. } = &self.trigger {
            let known = RiskInputs::metric_names(self.category);
            if !known.contains(&metric.as_str()) {
                return Err(VigiaError::Validation(format!(
                    "{} rule: unknown {} metric '{metric}', expected one of {}",
                    self.strategy,
                    self.category,
                    known.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// A fired rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mitigation {
    /// Category at risk
    pub category: RiskCategory,
    /// Recommended action
    pub strategy: MitigationStrategy,
    /// Urgency
    pub priority: Priority,
    /// Expected risk reduction in [0, 1]
    pub effectiveness: f64,
    /// Relative cost in [0, 1]
    pub cost: f64,
    /// When the action takes effect
    pub timeframe: Timeframe,
    /// Human-readable recommendation
    pub description: String,
    /// Observed value that crossed the threshold
    pub trigger_value: f64,
}

/// Default rule table.
#[must_use]
pub fn default_rules() -> Vec<MitigationRule> {
    fn rule(
        category: RiskCategory,
        trigger: Trigger,
        strategy: MitigationStrategy,
        priority: Priority,
        (effectiveness, cost): (f64, f64),
        timeframe: Timeframe,
        description: &str,
    ) -> MitigationRule {
        MitigationRule {
            category,
            trigger,
            strategy,
            priority,
            effectiveness,
            cost,
            timeframe,
            description: description.to_string(),
        }
    }
    let score = |threshold| Trigger::Score { threshold };

    vec![
        rule(
            RiskCategory::Market,
            score(0.1),
            MitigationStrategy::Diversification,
            Priority::High,
            (0.6, 0.2),
            Timeframe::ShortTerm,
            "Spread exposure across less correlated assets",
        ),
        rule(
            RiskCategory::Market,
            score(0.6),
            MitigationStrategy::Hedging,
            Priority::Critical,
            (0.8, 0.5),
            Timeframe::Immediate,
            "Hedge directional exposure with options or futures",
        ),
        rule(
            RiskCategory::Liquidity,
            score(0.3),
            MitigationStrategy::LiquidityBuffer,
            Priority::High,
            (0.7, 0.3),
            Timeframe::Immediate,
            "Raise the cash buffer and stagger large exits",
        ),
        rule(
            RiskCategory::Credit,
            Trigger::Metric {
                metric: "default_probability".to_string(),
                threshold: 0.05,
            },
            MitigationStrategy::CollateralManagement,
            Priority::High,
            (0.75, 0.25),
            Timeframe::ShortTerm,
            "Require additional collateral from weak counterparties",
        ),
        rule(
            RiskCategory::Credit,
            score(0.5),
            MitigationStrategy::ExposureLimits,
            Priority::Medium,
            (0.65, 0.15),
            Timeframe::MediumTerm,
            "Lower per-counterparty exposure limits",
        ),
        rule(
            RiskCategory::Operational,
            score(0.3),
            MitigationStrategy::ProcessControls,
            Priority::Medium,
            (0.6, 0.3),
            Timeframe::MediumTerm,
            "Add redundancy and review operating procedures",
        ),
        rule(
            RiskCategory::Systemic,
            score(0.2),
            MitigationStrategy::TailHedging,
            Priority::Low,
            (0.5, 0.4),
            Timeframe::LongTerm,
            "Buy out-of-the-money protection against market-wide stress",
        ),
    ]
}

/// Maps category scores to recommended mitigations.
#[derive(Debug, Clone)]
pub struct MitigationGenerator {
    rules: Vec<MitigationRule>,
}

impl Default for MitigationGenerator {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl MitigationGenerator {
    /// Create a generator over a custom rule table.
    pub fn new(rules: Vec<MitigationRule>) -> Result<Self> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    /// Rule table in use.
    pub fn rules(&self) -> &[MitigationRule] {
        &self.rules
    }

    /// Every fired rule, highest priority first.
    ///
    /// Ties are broken by effectiveness (descending), then by rule order.
    /// A metric trigger never fires for a score without raw inputs.
    #[must_use]
    pub fn generate(&self, scores: &[RiskCategoryScore]) -> Vec<Mitigation> {
        let mut fired: Vec<Mitigation> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let score = scores.iter().find(|s| s.category == rule.category)?;
                let observed = rule.trigger.observed(score)?;
                (observed > rule.trigger.threshold()).then(|| Mitigation {
                    category: rule.category,
                    strategy: rule.strategy,
                    priority: rule.priority,
                    effectiveness: rule.effectiveness,
                    cost: rule.cost,
                    timeframe: rule.timeframe,
                    description: rule.description.clone(),
                    trigger_value: observed,
                })
            })
            .collect();

        // stable: equal keys keep rule order
        fired.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.effectiveness.total_cmp(&a.effectiveness))
        });
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::CreditMetrics;

    fn score(category: RiskCategory, value: f64) -> RiskCategoryScore {
        RiskCategoryScore::from_score(category, value, 0.2).unwrap()
    }

    #[test]
    fn test_market_rules() {
        let generator = MitigationGenerator::default();
        let low = generator.generate(&[score(RiskCategory::Market, 0.1)]);
        assert!(low.is_empty());

        let high = generator.generate(&[score(RiskCategory::Market, 0.8)]);
        let strategies: Vec<_> = high.iter().map(|m| m.strategy).collect();
        assert_eq!(
            strategies,
            vec![MitigationStrategy::Hedging, MitigationStrategy::Diversification]
        );
    }

    #[test]
    fn test_metric_trigger() {
        let inputs = RiskInputs::Credit(CreditMetrics {
            default_probability: 0.07,
            counterparty_risk: 0.0,
        });
        let with_metrics = RiskCategoryScore {
            raw_metrics: Some(inputs),
            ..score(RiskCategory::Credit, 0.35)
        };
        let fired = MitigationGenerator::default().generate(&[with_metrics]);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].strategy, MitigationStrategy::CollateralManagement);
        assert!((fired[0].trigger_value - 0.07).abs() < 1e-12);

        // no raw inputs: metric trigger stays silent
        let fired = MitigationGenerator::default().generate(&[score(RiskCategory::Credit, 0.35)]);
        assert!(fired.is_empty());
    }

    #[test]
    fn test_priority_ordering() {
        let scores = [
            score(RiskCategory::Systemic, 0.9),
            score(RiskCategory::Operational, 0.9),
            score(RiskCategory::Liquidity, 0.9),
            score(RiskCategory::Market, 0.9),
        ];
        let fired = MitigationGenerator::default().generate(&scores);
        let priorities: Vec<_> = fired.iter().map(|m| m.priority).collect();
        assert_eq!(
            priorities,
            vec![
                Priority::Critical,
                Priority::High,
                Priority::High,
                Priority::Medium,
                Priority::Low
            ]
        );
        // equal priority: more effective first
        assert_eq!(fired[1].strategy, MitigationStrategy::LiquidityBuffer);
        assert_eq!(fired[2].strategy, MitigationStrategy::Diversification);
    }

    #[test]
    fn test_generate_does_not_mutate() {
        let scores = vec![score(RiskCategory::Market, 0.9)];
        let before = scores.clone();
        let _ = MitigationGenerator::default().generate(&scores);
        assert_eq!(scores, before);
    }

    #[test]
    fn test_rule_validation() {
        let mut rule = default_rules().remove(0);
        rule.effectiveness = 1.5;
        assert!(MitigationGenerator::new(vec![rule]).is_err());
    }

    #[test]
    fn test_unknown_trigger_metric_rejected() {
        let credit_metric_rule = || {
            default_rules()
                .into_iter()
                .find(|r| matches!(r.trigger, Trigger::Metric { .. }))
                .unwrap()
        };

        let mut misspelled = credit_metric_rule();
        misspelled.trigger = Trigger::Metric {
            metric: "default_probabilty".to_string(),
            threshold: 0.05,
        };
        assert!(matches!(
            MitigationGenerator::new(vec![misspelled]),
            Err(VigiaError::Validation(_))
        ));

        let mut foreign = credit_metric_rule();
        foreign.trigger = Trigger::Metric {
            metric: "var_fraction".to_string(),
            threshold: 0.05,
        };
        assert!(foreign.validate().is_err());

        assert!(credit_metric_rule().validate().is_ok());
    }
}
