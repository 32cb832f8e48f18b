//! Forecast ensemble combination for vigia.
//!
//! This crate merges forecasts from several models into one prediction.
//! It offers weighted, majority-direction and stacked combination. It also
//! measures diversity between models, adapts weights from accuracy, and
//! attaches a scalar uncertainty computed by variance, bootstrap or
//! conformal methods.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vigia_ensemble::{CombinerConfig, EnsembleCombiner, WeightAdapter, AdapterConfig};
//! use vigia_traits::{EnsembleWeights, ModelKind, WeightBounds};
//! # fn records() -> Vec<vigia_traits::ForecastRecord> { unimplemented!() }
//!
//! let records = records();
//! let weights = EnsembleWeights::equal(
//!     records.iter().map(|r| r.model_id()).collect(),
//!     WeightBounds::default(),
//! )
//! .unwrap();
//!
//! let combiner = EnsembleCombiner::new(CombinerConfig::default()).unwrap();
//! let combined = combiner.combine(&records, &weights).unwrap();
//!
//! let mut adapter = WeightAdapter::new(AdapterConfig::default()).unwrap();
//! let next = adapter.update(&records, &weights).unwrap();
//! assert_eq!(next.version(), weights.version() + 1);
//! # let _ = combined;
//! ```

mod adapter;
mod combiner;
mod diversity;
mod majority;
mod stacking;
mod uncertainty;
mod weighted;

// Re-export main types
pub use adapter::{AdapterConfig, WeightAdapter, update_weights};
pub use combiner::{
    CombinationStrategy, CombinedForecast, Combiner, CombinerConfig, EnsembleCombiner,
    ModelContribution, align_weights,
};
pub use diversity::{DiversityAnalyzer, DiversityReport, PairwiseDiversity, individual_diversity};
pub use majority::{Direction, MajorityConfig, MajorityDirectionCombiner};
pub use stacking::StackingCombiner;
pub use uncertainty::{
    CalibrationSet, UncertaintyEstimate, UncertaintyMethod, UncertaintyQuantifier,
    bootstrap_uncertainty, variance_uncertainty,
};
pub use weighted::WeightedCombiner;
