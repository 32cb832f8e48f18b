//! Stateful forecast cycle and the one-shot entry points.

use tracing::{debug, info, warn};
use vigia_ensemble::{
    CalibrationSet, CombinationStrategy, CombinedForecast, CombinerConfig, EnsembleCombiner,
    WeightAdapter,
};
use vigia_traits::{EnsembleWeights, ForecastRecord, ModelKind, Result, VigiaError};

use crate::config::VigiaConfig;

/// Combine `records` under `weights` with the default settings of
/// `strategy`.
///
/// Stacking needs a fitted meta-model and therefore fails here; build an
/// [`EnsembleCombiner`] with [`EnsembleCombiner::with_meta_model`] instead.
pub fn combine(
    records: &[ForecastRecord],
    weights: &EnsembleWeights,
    strategy: CombinationStrategy,
) -> Result<CombinedForecast> {
    EnsembleCombiner::new(CombinerConfig {
        strategy,
        ..CombinerConfig::default()
    })?
    .combine(records, weights)
}

/// Owns the mutable ensemble state of one forecasting target.
///
/// The engine is the single writer of the weight snapshot and the
/// calibration set. Both are replaced wholesale after each step, so a
/// snapshot handed out by [`weights`](Self::weights) never changes under the
/// reader.
///
/// # Examples
///
/// ```rust,no_run
/// use vigia::{ForecastEngine, VigiaConfig};
/// use vigia::traits::ModelKind;
/// # fn records() -> Vec<vigia::traits::ForecastRecord> { unimplemented!() }
///
/// let mut engine = ForecastEngine::new(
///     &VigiaConfig::default(),
///     vec![ModelKind::Arima, ModelKind::Prophet, ModelKind::Lstm],
/// ).unwrap();
///
/// let forecast = engine.run_cycle(&records()).unwrap();
/// // once the first step is realized
/// engine.record_outcome(101.2).unwrap();
/// # let _ = forecast;
/// ```
#[derive(Debug)]
pub struct ForecastEngine {
    combiner: EnsembleCombiner,
    adapter: WeightAdapter,
    weights: EnsembleWeights,
    calibration: CalibrationSet,
    pending: Option<f64>,
}

impl ForecastEngine {
    /// Start with equal weights over `models`.
    pub fn new(config: &VigiaConfig, models: Vec<ModelKind>) -> Result<Self> {
        let weights = EnsembleWeights::equal(models, config.bounds)?;
        Self::with_weights(config, weights)
    }

    /// Start from an existing weight snapshot.
    pub fn with_weights(config: &VigiaConfig, weights: EnsembleWeights) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            combiner: config.build_combiner()?,
            adapter: WeightAdapter::new(config.adapter.clone())?,
            weights,
            calibration: CalibrationSet::new(config.calibration_capacity),
            pending: None,
        })
    }

    /// Current weight snapshot.
    pub const fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    /// Current calibration snapshot.
    pub const fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    /// Combiner in use.
    pub const fn combiner(&self) -> &EnsembleCombiner {
        &self.combiner
    }

    /// Combine this cycle's records, then adapt the weights for the next one.
    ///
    /// The combination reads the snapshot as it was before the update. A
    /// failed weight update is logged and the previous snapshot kept; it
    /// never fails the cycle.
    pub fn run_cycle(&mut self, records: &[ForecastRecord]) -> Result<CombinedForecast> {
        let forecast = self
            .combiner
            .combine_calibrated(records, &self.weights, &self.calibration)?;

        match self.adapter.update(records, &self.weights) {
            Ok(next) => {
                debug!(version = next.version(), "weight snapshot advanced");
                self.weights = next;
            }
            Err(e) => warn!(
                error = %e,
                version = self.weights.version(),
                "weight update failed, keeping previous snapshot"
            ),
        }

        self.pending = forecast.values.first().copied();
        info!(
            strategy = %forecast.strategy,
            horizon = forecast.values.len(),
            uncertainty = forecast.uncertainty,
            "forecast cycle complete"
        );
        Ok(forecast)
    }

    /// Record the realized value of the last cycle's first forecast step.
    ///
    /// # Errors
    ///
    /// [`VigiaError::InsufficientData`] if no cycle has produced a forecast
    /// since the last recorded outcome.
    pub fn record_outcome(&mut self, realized: f64) -> Result<()> {
        let forecast = self.pending.take().ok_or_else(|| {
            VigiaError::InsufficientData("no pending forecast to score".to_string())
        })?;
        self.record_residual(forecast, realized)
    }

    /// Record an arbitrary `(forecast, realized)` pair.
    pub fn record_residual(&mut self, forecast: f64, realized: f64) -> Result<()> {
        self.calibration = self.calibration.with_residual(forecast, realized)?;
        debug!(
            residuals = self.calibration.len(),
            "calibration set updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, three_records};
    use approx::assert_relative_eq;
    use vigia_ensemble::UncertaintyMethod;
    use vigia_traits::WeightBounds;

    fn models() -> Vec<ModelKind> {
        vec![ModelKind::Arima, ModelKind::Prophet, ModelKind::Lstm]
    }

    #[test]
    fn test_combine_entry_point() {
        let records = three_records();
        let weights = EnsembleWeights::equal(models(), WeightBounds::default()).unwrap();
        let forecast = combine(&records, &weights, CombinationStrategy::Weighted).unwrap();
        assert_relative_eq!(forecast.values[1], 302.0 / 3.0, epsilon = 1e-9);
        assert!(combine(&records, &weights, CombinationStrategy::Stacking).is_err());
    }

    #[test]
    fn test_run_cycle_advances_weights() {
        let mut engine = ForecastEngine::new(&VigiaConfig::default(), models()).unwrap();
        let before = engine.weights().clone();
        let forecast = engine.run_cycle(&three_records()).unwrap();

        // combined under the old snapshot
        assert_eq!(forecast.weights, before);
        assert_eq!(engine.weights().version(), 1);
        let total: f64 = engine.weights().weights().iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_failed_update_keeps_snapshot() {
        let mut engine = ForecastEngine::new(&VigiaConfig::default(), models()).unwrap();
        // two of three models report: combination works, adaptation cannot
        let records = three_records()[..2].to_vec();
        let forecast = engine.run_cycle(&records).unwrap();
        assert_eq!(forecast.values.len(), 4);
        assert_eq!(engine.weights().version(), 0);
    }

    #[test]
    fn test_record_outcome_feeds_calibration() {
        let config = VigiaConfig {
            combiner: CombinerConfig {
                uncertainty: UncertaintyMethod::Conformal { alpha: 0.1 },
                ..CombinerConfig::default()
            },
            ..VigiaConfig::default()
        };
        let mut engine = ForecastEngine::new(&config, models()).unwrap();
        assert!(engine.record_outcome(100.0).is_err());

        let first = engine.run_cycle(&three_records()).unwrap();
        assert_eq!(first.uncertainty_method, UncertaintyMethod::Variance);

        engine.record_outcome(101.5).unwrap();
        assert_eq!(engine.calibration().len(), 1);
        // outcome consumed
        assert!(engine.record_outcome(101.5).is_err());

        let second = engine.run_cycle(&three_records()).unwrap();
        assert_eq!(second.uncertainty_method, config.combiner.uncertainty);
        assert_relative_eq!(second.uncertainty, 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_meta_model_from_config() {
        let config = VigiaConfig {
            combiner: CombinerConfig {
                strategy: CombinationStrategy::Stacking,
                ..CombinerConfig::default()
            },
            meta_model: Some(vigia_traits::LinearMetaModel::averaging(2)),
            ..VigiaConfig::default()
        };
        let mut engine =
            ForecastEngine::new(&config, vec![ModelKind::Arima, ModelKind::Lstm]).unwrap();
        let records = vec![
            record(ModelKind::Arima, &[1.0, 2.0]),
            record(ModelKind::Lstm, &[3.0, 4.0]),
        ];
        let forecast = engine.run_cycle(&records).unwrap();
        assert_relative_eq!(forecast.values[0], 2.0);
        assert_relative_eq!(forecast.values[1], 3.0);
    }
}
