//! Multi-category risk scoring for vigia.
//!
//! Five independent calculators (market, liquidity, credit, operational,
//! systemic) each turn raw metrics into a normalized score in [0, 1]. The
//! aggregator weights them by policy, applies a correlation uplift, and
//! returns one bounded overall score. The report breaks the score down by
//! category, timeframe and severity, and lists rule-based mitigations.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vigia_risk::{RiskConfig, RiskInputBundle, assess_risk};
//! # fn bundle() -> RiskInputBundle { unimplemented!() }
//!
//! let report = assess_risk(&bundle(), &RiskConfig::default()).unwrap();
//! for mitigation in &report.mitigations {
//!     println!("{} [{}]: {}", mitigation.strategy, mitigation.priority, mitigation.description);
//! }
//! ```

mod aggregator;
mod calculators;
mod category;
mod metrics;
mod mitigation;
mod policy;

// Re-export main types
pub use aggregator::{
    CategoryBreakdown, RiskAggregator, RiskConfig, RiskReport, aggregate_risk, assess_risk,
};
pub use calculators::{
    CalculatorConfig, CreditConfig, CreditRiskCalculator, LiquidityConfig,
    LiquidityRiskCalculator, MarketRiskCalculator, OperationalRiskCalculator, RiskCalculator,
    RiskCategoryScore, SystemicConfig, SystemicRiskCalculator, compute_all,
};
pub use category::{RiskCategory, Severity, Timeframe};
pub use metrics::{
    CreditMetrics, LiquidityMetrics, MarketMetrics, OperationalMetrics, RiskInputBundle,
    RiskInputs, SystemicMetrics,
};
pub use mitigation::{
    Mitigation, MitigationGenerator, MitigationRule, MitigationStrategy, Priority, Trigger,
    default_rules,
};
pub use policy::{CorrelationAdjustment, RiskPolicy};
