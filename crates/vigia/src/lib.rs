#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vigia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # vigia
//!
//! Forecast ensemble combination and multi-category risk aggregation.
//!
//! vigia is an umbrella crate that re-exports all vigia sub-crates for
//! convenience, and adds the pieces that tie the two pipelines together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vigia::prelude::*;
//! # fn records() -> Vec<ForecastRecord> { unimplemented!() }
//! # fn bundle() -> RiskInputBundle { unimplemented!() }
//!
//! # fn main() -> Result<()> {
//! let config = VigiaConfig::default();
//! let mut engine = ForecastEngine::new(
//!     &config,
//!     vec![ModelKind::Arima, ModelKind::Prophet, ModelKind::Lstm],
//! )?;
//!
//! // Combine, then adapt weights for the next cycle
//! let forecast = engine.run_cycle(&records())?;
//!
//! // Independently, score and aggregate risk
//! let report = assess_risk(&bundle(), &config.risk)?;
//! println!("{:?} at {} risk", forecast.values, report.overall_severity);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Data contracts ([`ForecastRecord`], [`EnsembleWeights`], errors)
//! - [`ensemble`] - Combination strategies, weight adaptation, uncertainty
//! - [`risk`] - Category calculators, aggregation, mitigation rules
//!
//! ## Architecture
//!
//! 1. **Forecast records** arrive from independently fitted models
//! 2. **Diversity analysis** and **weight adaptation** score the models
//! 3. **Combiners** merge the forecasts under a weight snapshot
//! 4. **Risk calculators** score each category in parallel
//! 5. The **aggregator** rolls the scores into one report with mitigations

/// Version information for the vigia crate.
///
/// This constant contains the current version of vigia as specified in Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod analysis;
mod config;
mod engine;

pub use analysis::{DecisionRecord, analyze};
pub use config::{ConfigError, VigiaConfig};
pub use engine::{ForecastEngine, combine};

// ============================================================================
// Data Contracts
// ============================================================================

/// Core data contracts for vigia.
///
/// - [`ForecastRecord`] - One model's forecast for one cycle
/// - [`EnsembleWeights`] - Versioned, immutable weight snapshot
/// - [`MetaModel`] - Seam for stacked ensembles
/// - [`VigiaError`] - Error taxonomy
pub mod traits {
    pub use vigia_traits::*;
}

pub use vigia_traits::{
    AccuracyReport, ConfidenceInterval, EnsembleWeights, ForecastRecord, MetaModel, ModelKind,
    Result, VigiaError, WeightBounds,
};

// ============================================================================
// Ensemble
// ============================================================================

/// Forecast ensemble combination.
///
/// ## Available Strategies
///
/// - **Weighted**: weight-renormalized average over the models present at
///   each step
/// - **MajorityDirection**: mean of the models agreeing with the winning
///   up/down/sideways vote
/// - **Stacking**: a fitted meta-model over the base forecasts
///
/// Uncertainty comes from within-model variance, a seeded bootstrap over
/// models, or conformal quantiles of historical residuals.
pub mod ensemble {
    pub use vigia_ensemble::*;
}

pub use vigia_ensemble::{
    CombinationStrategy, CombinedForecast, Combiner, EnsembleCombiner, update_weights,
};

// ============================================================================
// Risk
// ============================================================================

/// Multi-category risk aggregation.
///
/// Default policy weights:
///
/// ```text
/// market 0.35, liquidity 0.25, credit 0.20, operational 0.15, systemic 0.05
/// overall = min(1, Σ score_c * weight_c * (1 + correlation_adjustment))
/// ```
///
/// Severity buckets: LOW < 0.3 <= MEDIUM < 0.6 <= HIGH < 0.85 <= CRITICAL.
pub mod risk {
    pub use vigia_risk::*;
}

pub use vigia_risk::{RiskInputBundle, RiskReport, aggregate_risk, assess_risk};

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use vigia::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CombinationStrategy, CombinedForecast, DecisionRecord, EnsembleWeights, ForecastEngine,
        ForecastRecord, ModelKind, Result, RiskInputBundle, RiskReport, VigiaConfig, VigiaError,
        analyze, assess_risk,
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use vigia_risk::{
        CreditMetrics, LiquidityMetrics, MarketMetrics, OperationalMetrics, RiskInputBundle,
        SystemicMetrics,
    };
    use vigia_traits::{AccuracyReport, ConfidenceInterval, ForecastRecord, ModelKind};

    pub(crate) fn record(model: ModelKind, values: &[f64]) -> ForecastRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ForecastRecord::new(
            model,
            values.to_vec(),
            (0..values.len())
                .map(|d| start + Duration::days(d as i64))
                .collect(),
            values
                .iter()
                .map(|&v| ConfidenceInterval::symmetric(v, 1.0, 0.95))
                .collect(),
            AccuracyReport {
                mae: 0.4,
                mse: 0.2,
                rmse: 0.1,
                mape: 0.05,
                r2: 0.8,
                directional_accuracy: 0.6,
            },
        )
        .unwrap()
    }

    pub(crate) fn three_records() -> Vec<ForecastRecord> {
        vec![
            record(ModelKind::Arima, &[100.0, 101.0, 102.0, 103.0]),
            record(ModelKind::Prophet, &[100.0, 99.0, 98.0, 97.0]),
            record(ModelKind::Lstm, &[100.0, 102.0, 104.0, 106.0]),
        ]
    }

    /// Scores 0.8 / 0.2 / 0.1 / 0.1 / 0.1.
    pub(crate) fn bundle() -> RiskInputBundle {
        RiskInputBundle {
            market: MarketMetrics { var_fraction: 0.8 },
            liquidity: LiquidityMetrics {
                bid_ask_spread: 0.001,
                market_depth: 10.0 / 3.0,
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
        }
    }
}
