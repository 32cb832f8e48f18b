//! Roll-up of category scores into one bounded risk score.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use vigia_traits::{Result, VigiaError};

use crate::{
    calculators::{CalculatorConfig, RiskCategoryScore, compute_all},
    category::{RiskCategory, Severity, Timeframe},
    metrics::RiskInputBundle,
    mitigation::{Mitigation, MitigationGenerator, MitigationRule, default_rules},
    policy::{CorrelationAdjustment, RiskPolicy},
};

/// Configuration of the whole risk pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Category weights
    pub policy: RiskPolicy,
    /// Co-movement uplift
    pub correlation: CorrelationAdjustment,
    /// Calculator normalization parameters
    pub calculators: CalculatorConfig,
    /// Mitigation rule table
    pub mitigation_rules: Vec<MitigationRule>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            policy: RiskPolicy::default(),
            correlation: CorrelationAdjustment::default(),
            calculators: CalculatorConfig::default(),
            mitigation_rules: default_rules(),
        }
    }
}

impl RiskConfig {
    /// Check every part of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        self.correlation.validate()?;
        self.calculators.validate()?;
        for rule in &self.mitigation_rules {
            rule.validate()?;
        }
        Ok(())
    }
}

/// One row of the by-category breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    /// Category
    pub category: RiskCategory,
    /// Normalized score in [0, 1]
    pub score: f64,
    /// Policy weight
    pub weight: f64,
    /// `score * weight`
    pub contribution: f64,
    /// Severity bucket of the score
    pub severity: Severity,
    /// Horizon of the category
    pub timeframe: Timeframe,
}

/// Result of one aggregation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// `min(1, weighted_score * (1 + correlation_adjustment))`
    pub overall_score: f64,
    /// Severity bucket of the overall score
    pub overall_severity: Severity,
    /// `Σ score_c * weight_c`
    pub weighted_score: f64,
    /// Uplift applied for co-movement
    pub correlation_adjustment: f64,
    /// Per-category rows, largest contribution first
    pub by_category: Vec<CategoryBreakdown>,
    /// Summed contributions per timeframe
    pub by_timeframe: BTreeMap<Timeframe, f64>,
    /// Categories per severity bucket
    pub by_severity: BTreeMap<Severity, Vec<RiskCategory>>,
    /// Fired mitigations, highest priority first
    pub mitigations: Vec<Mitigation>,
}

/// Rolls category scores up into a [`RiskReport`].
///
/// The aggregator applies its own policy weights; the weight carried on an
/// incoming score is ignored.
///
/// # Examples
///
/// ```rust,no_run
/// use vigia_risk::{RiskAggregator, RiskCategory, RiskCategoryScore, RiskConfig};
///
/// let aggregator = RiskAggregator::new(RiskConfig::default()).unwrap();
/// let scores = vec![
///     RiskCategoryScore::from_score(RiskCategory::Market, 0.8, 0.35).unwrap(),
///     RiskCategoryScore::from_score(RiskCategory::Liquidity, 0.2, 0.25).unwrap(),
/// ];
/// let report = aggregator.aggregate(&scores).unwrap();
/// println!("{} ({})", report.overall_score, report.overall_severity);
/// ```
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    policy: RiskPolicy,
    correlation: CorrelationAdjustment,
    mitigation: MitigationGenerator,
}

impl RiskAggregator {
    /// Create an aggregator, validating the policy and adjustment.
    pub fn new(config: RiskConfig) -> Result<Self> {
        config.policy.validate()?;
        config.correlation.validate()?;
        Ok(Self {
            policy: config.policy,
            correlation: config.correlation,
            mitigation: MitigationGenerator::new(config.mitigation_rules)?,
        })
    }

    /// Policy in use.
    pub const fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Aggregate one cycle's category scores.
    ///
    /// A category without a score contributes nothing.
    ///
    /// # Errors
    ///
    /// - [`VigiaError::InsufficientData`] if `scores` is empty
    /// - [`VigiaError::Validation`] if a category appears twice
    /// - [`VigiaError::Range`] if a score is outside [0, 1]
    pub fn aggregate(&self, scores: &[RiskCategoryScore]) -> Result<RiskReport> {
        if scores.is_empty() {
            return Err(VigiaError::InsufficientData(
                "no category scores to aggregate".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(scores.len());
        if let Some(dup) = scores.iter().find(|s| !seen.insert(s.category)) {
            return Err(VigiaError::Validation(format!(
                "category {} scored more than once",
                dup.category
            )));
        }
        let scores = scores
            .iter()
            .map(|s| s.reweighted(self.policy.weight(s.category)))
            .collect::<Result<Vec<_>>>()?;
        if scores.len() < RiskCategory::ALL.len() {
            warn!(
                scored = scores.len(),
                "some risk categories have no score and contribute nothing"
            );
        }

        let weighted_score: f64 = scores.iter().map(|s| s.contribution).sum();
        let correlation_adjustment = self.correlation.factor(&self.policy);
        let overall_score = (weighted_score * (1.0 + correlation_adjustment)).clamp(0.0, 1.0);

        let mut by_category: Vec<CategoryBreakdown> = scores
            .iter()
            .map(|s| CategoryBreakdown {
                category: s.category,
                score: s.normalized_score,
                weight: s.weight,
                contribution: s.contribution,
                severity: Severity::from_score(s.normalized_score),
                timeframe: s.category.timeframe(),
            })
            .collect();
        by_category.sort_by_key(|b| b.category);
        by_category.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

        let mut by_timeframe = BTreeMap::new();
        let mut by_severity: BTreeMap<Severity, Vec<RiskCategory>> = BTreeMap::new();
        for row in &by_category {
            *by_timeframe.entry(row.timeframe).or_insert(0.0) += row.contribution;
            by_severity.entry(row.severity).or_default().push(row.category);
        }

        let mitigations = self.mitigation.generate(&scores);
        let overall_severity = Severity::from_score(overall_score);

        debug!(
            weighted_score,
            correlation_adjustment,
            overall_score,
            severity = %overall_severity,
            mitigations = mitigations.len(),
            "aggregated risk"
        );

        Ok(RiskReport {
            overall_score,
            overall_severity,
            weighted_score,
            correlation_adjustment,
            by_category,
            by_timeframe,
            by_severity,
            mitigations,
        })
    }
}

/// Aggregate category scores under `policy` with the default correlation
/// adjustment and mitigation rules.
pub fn aggregate_risk(scores: &[RiskCategoryScore], policy: &RiskPolicy) -> Result<RiskReport> {
    RiskAggregator::new(RiskConfig {
        policy: *policy,
        ..RiskConfig::default()
    })?
    .aggregate(scores)
}

/// Full risk pipeline: score every category of `bundle` in parallel, then
/// aggregate.
pub fn assess_risk(bundle: &RiskInputBundle, config: &RiskConfig) -> Result<RiskReport> {
    config.validate()?;
    let scores = compute_all(bundle, &config.policy, &config.calculators)?;
    RiskAggregator::new(config.clone())?.aggregate(&scores)
}
