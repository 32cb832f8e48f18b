//! Core combiner trait and the ensemble front end.

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use vigia_traits::{
    ConfidenceInterval, EnsembleWeights, ForecastRecord, MetaModel, ModelKind, Result,
    VigiaError, stats, validate_ensemble,
};

use crate::{
    diversity::{DiversityAnalyzer, DiversityReport},
    majority::{MajorityConfig, MajorityDirectionCombiner},
    stacking::StackingCombiner,
    uncertainty::{CalibrationSet, UncertaintyMethod, UncertaintyQuantifier},
    weighted::WeightedCombiner,
};

/// Combines per-model forecasts into one value per horizon step.
///
/// `weights` is aligned with `records` (one weight per record, same order).
/// All implementations must be thread-safe (`Send + Sync`) so one combiner
/// can serve concurrent analysis tasks.
///
/// # Examples
///
/// ```rust,no_run
/// use ndarray::Array1;
/// use vigia_ensemble::Combiner;
/// use vigia_traits::ForecastRecord;
///
/// #[derive(Debug)]
/// struct FirstModel;
///
/// impl Combiner for FirstModel {
///     fn combine(&self, records: &[ForecastRecord], _weights: &[f64]) -> vigia_traits::Result<Array1<f64>> {
///         Ok(Array1::from_vec(records[0].values().to_vec()))
///     }
///
///     fn name(&self) -> &str {
///         "first_model"
///     }
/// }
/// ```
pub trait Combiner: Send + Sync + std::fmt::Debug {
    /// Combine the records into one forecast of the common horizon.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No records provided, or weights do not align with records
    /// - Records have mismatched horizons
    /// - A step cannot be combined (no model forecast it)
    fn combine(&self, records: &[ForecastRecord], weights: &[f64]) -> Result<Array1<f64>>;

    /// Name of this combination strategy.
    ///
    /// Used for logging and identification in reports.
    fn name(&self) -> &str;
}

/// Shape checks shared by every combiner. Returns the horizon.
pub(crate) fn check_inputs(records: &[ForecastRecord], weights: &[f64]) -> Result<usize> {
    let first = records.first().ok_or(VigiaError::InsufficientModels {
        required: 1,
        actual: 0,
    })?;
    if weights.len() != records.len() {
        return Err(VigiaError::Validation(format!(
            "{} records but {} weights",
            records.len(),
            weights.len()
        )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(VigiaError::Validation(
            "combination weights must be finite and non-negative".to_string(),
        ));
    }
    let horizon = first.horizon();
    if let Some(r) = records.iter().find(|r| r.horizon() != horizon) {
        return Err(VigiaError::Validation(format!(
            "model '{}' has horizon {}, expected {}",
            r.model_id(),
            r.horizon(),
            horizon
        )));
    }
    Ok(horizon)
}

/// Models × horizon matrix of point forecasts (`NaN` where missing).
pub(crate) fn value_matrix(records: &[ForecastRecord], horizon: usize) -> Array2<f64> {
    Array2::from_shape_fn((records.len(), horizon), |(i, t)| records[i].values()[t])
}

/// Combination strategy selected by configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum CombinationStrategy {
    /// Weighted average renormalized over the models present at each step
    #[default]
    #[display("weighted")]
    Weighted,
    /// Mean of the models agreeing with the winning direction vote
    #[display("majority_direction")]
    MajorityDirection,
    /// Meta-model over the base forecasts
    #[display("stacking")]
    Stacking,
}

/// Configuration for [`EnsembleCombiner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinerConfig {
    /// Strategy used to combine values
    pub strategy: CombinationStrategy,

    /// Settings for the majority-direction strategy
    pub majority: MajorityConfig,

    /// Normal quantile used for the combined intervals
    pub interval_z: f64,

    /// Nominal coverage reported on the combined intervals
    pub confidence_level: f64,

    /// Method used to attach the scalar uncertainty
    pub uncertainty: UncertaintyMethod,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            strategy: CombinationStrategy::Weighted,
            majority: MajorityConfig::default(),
            interval_z: 1.96,
            confidence_level: 0.95,
            uncertainty: UncertaintyMethod::Variance,
        }
    }
}

impl CombinerConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.interval_z.is_finite() && self.interval_z > 0.0) {
            return Err(VigiaError::Validation(format!(
                "interval_z must be positive, got {}",
                self.interval_z
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(VigiaError::Validation(format!(
                "confidence_level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        self.majority.validate()?;
        self.uncertainty.validate()
    }
}

/// What one model brought to a combined forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelContribution {
    /// Forecaster
    pub model_id: ModelKind,
    /// Ensemble weight at combination time
    pub weight: f64,
    /// Accuracy-based performance score in [0, 1]
    pub performance: f64,
    /// Individual diversity score in [0, 1]
    pub diversity: f64,
    /// `weight * performance * diversity`
    pub contribution: f64,
}

/// Result of one ensemble combination. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedForecast {
    /// Strategy that produced the values
    pub strategy: CombinationStrategy,
    /// Shared forecast timestamps
    pub timestamps: Vec<DateTime<Utc>>,
    /// Combined point forecasts
    pub values: Vec<f64>,
    /// Per-step intervals from the weighted spread of model values
    pub confidence_intervals: Vec<ConfidenceInterval>,
    /// Weight snapshot used for this combination
    pub weights: EnsembleWeights,
    /// Per-model contributions
    pub model_contributions: Vec<ModelContribution>,
    /// Diversity of the inputs
    pub diversity: DiversityReport,
    /// Method that produced [`Self::uncertainty`]
    pub uncertainty_method: UncertaintyMethod,
    /// Scalar uncertainty, finite and non-negative
    pub uncertainty: f64,
}

impl CombinedForecast {
    /// Mean of the combined values.
    pub fn mean_value(&self) -> Option<f64> {
        stats::mean(&self.values)
    }
}

/// Ensemble front end: validates inputs, combines under the configured
/// strategy, and attaches intervals, contributions and uncertainty.
///
/// The combiner only reads the weight snapshot it is given; adapting weights
/// is the [`WeightAdapter`](crate::WeightAdapter)'s job.
///
/// # Examples
///
/// ```rust,no_run
/// use vigia_ensemble::{CombinerConfig, EnsembleCombiner};
/// # fn records() -> Vec<vigia_traits::ForecastRecord> { unimplemented!() }
/// # fn weights() -> vigia_traits::EnsembleWeights { unimplemented!() }
///
/// let combiner = EnsembleCombiner::new(CombinerConfig::default()).unwrap();
/// let combined = combiner.combine(&records(), &weights()).unwrap();
/// println!("{:?} ± {}", combined.values, combined.uncertainty);
/// ```
#[derive(Debug, Clone)]
pub struct EnsembleCombiner {
    config: CombinerConfig,
    meta_model: Option<Arc<dyn MetaModel>>,
    diversity: DiversityAnalyzer,
}

impl EnsembleCombiner {
    /// Create a combiner with the given configuration.
    pub fn new(config: CombinerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            meta_model: None,
            diversity: DiversityAnalyzer,
        })
    }

    /// Attach the meta-model used by the stacking strategy.
    #[must_use]
    pub fn with_meta_model(mut self, model: Arc<dyn MetaModel>) -> Self {
        self.meta_model = Some(model);
        self
    }

    /// Configured strategy.
    pub const fn strategy(&self) -> CombinationStrategy {
        self.config.strategy
    }

    /// Configuration in use.
    pub const fn config(&self) -> &CombinerConfig {
        &self.config
    }

    /// Same combiner with a different strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: CombinationStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Build the value combiner for the configured strategy.
    pub fn strategy_combiner(&self) -> Result<Box<dyn Combiner>> {
        Ok(match self.config.strategy {
            CombinationStrategy::Weighted => Box::new(WeightedCombiner),
            CombinationStrategy::MajorityDirection => {
                Box::new(MajorityDirectionCombiner::new(self.config.majority.clone()))
            }
            CombinationStrategy::Stacking => {
                let model = self.meta_model.clone().ok_or_else(|| {
                    VigiaError::Validation(
                        "stacking strategy requires a meta-model".to_string(),
                    )
                })?;
                Box::new(StackingCombiner::new(model))
            }
        })
    }

    /// Combine `records` under the weight snapshot `weights`.
    ///
    /// Conformal uncertainty has no calibration history here and falls back
    /// to the variance method; use [`Self::combine_calibrated`] to supply one.
    pub fn combine(
        &self,
        records: &[ForecastRecord],
        weights: &EnsembleWeights,
    ) -> Result<CombinedForecast> {
        self.combine_inner(records, weights, None)
    }

    /// Combine with a calibration set for conformal uncertainty.
    pub fn combine_calibrated(
        &self,
        records: &[ForecastRecord],
        weights: &EnsembleWeights,
        calibration: &CalibrationSet,
    ) -> Result<CombinedForecast> {
        self.combine_inner(records, weights, Some(calibration))
    }

    fn combine_inner(
        &self,
        records: &[ForecastRecord],
        weights: &EnsembleWeights,
        calibration: Option<&CalibrationSet>,
    ) -> Result<CombinedForecast> {
        validate_ensemble(records)?;
        let aligned = align_weights(records, weights)?;
        let diversity = self.diversity.analyze(records)?;
        let combiner = self.strategy_combiner()?;

        let values = combiner.combine(records, &aligned)?;
        let horizon = values.len();
        let matrix = value_matrix(records, horizon);

        let confidence_intervals = (0..horizon)
            .map(|t| {
                let column = matrix.column(t);
                let spread = stats::weighted_variance(
                    column.iter().copied().zip(aligned.iter().copied()),
                    values[t],
                );
                ConfidenceInterval::symmetric(
                    values[t],
                    self.config.interval_z * spread.sqrt(),
                    self.config.confidence_level,
                )
            })
            .collect();

        let model_contributions = records
            .iter()
            .zip(&aligned)
            .map(|(record, &weight)| {
                let performance = record.accuracy().performance_score();
                let div = diversity
                    .individual
                    .get(&record.model_id())
                    .copied()
                    .unwrap_or(0.0);
                ModelContribution {
                    model_id: record.model_id(),
                    weight,
                    performance,
                    diversity: div,
                    contribution: weight * performance * div,
                }
            })
            .collect();

        let quantifier = UncertaintyQuantifier::new(self.config.uncertainty.clone());
        let uncertainty =
            quantifier.quantify_with_fallback(records, &aligned, combiner.as_ref(), calibration)?;

        debug!(
            strategy = %self.config.strategy,
            models = records.len(),
            horizon,
            weights_version = weights.version(),
            aggregate_diversity = diversity.aggregate,
            uncertainty = uncertainty.value,
            "combined ensemble forecast"
        );

        Ok(CombinedForecast {
            strategy: self.config.strategy,
            timestamps: records[0].timestamps().to_vec(),
            values: values.to_vec(),
            confidence_intervals,
            weights: weights.clone(),
            model_contributions,
            diversity,
            uncertainty_method: uncertainty.method,
            uncertainty: uncertainty.value,
        })
    }
}

/// Pick the snapshot weight of each record, in record order.
///
/// Every record must belong to the snapshot. Models in the snapshot without a
/// record this cycle simply do not contribute.
pub fn align_weights(records: &[ForecastRecord], weights: &EnsembleWeights) -> Result<Vec<f64>> {
    let aligned = records
        .iter()
        .map(|r| {
            weights.weight_of(r.model_id()).ok_or_else(|| {
                VigiaError::Validation(format!(
                    "model '{}' has no weight in the ensemble",
                    r.model_id()
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    if records.len() < weights.len() {
        warn!(
            records = records.len(),
            models = weights.len(),
            "some ensemble models supplied no forecast this cycle"
        );
    }
    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use approx::assert_relative_eq;
    use vigia_traits::{LinearMetaModel, WeightBounds};

    fn records() -> Vec<ForecastRecord> {
        vec![
            record(ModelKind::Arima, &[100.0, 101.0, 102.0, 103.0]),
            record(ModelKind::Prophet, &[100.0, 99.0, 98.0, 97.0]),
            record(ModelKind::Lstm, &[100.0, 102.0, 104.0, 106.0]),
        ]
    }

    fn equal_weights(records: &[ForecastRecord]) -> EnsembleWeights {
        EnsembleWeights::equal(
            records.iter().map(|r| r.model_id()).collect(),
            WeightBounds::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_weighted_combination() {
        let records = records();
        let weights = equal_weights(&records);
        let combiner = EnsembleCombiner::new(CombinerConfig::default()).unwrap();
        let combined = combiner.combine(&records, &weights).unwrap();

        let expected = [100.0, 302.0 / 3.0, 304.0 / 3.0, 102.0];
        for (v, e) in combined.values.iter().zip(expected) {
            assert_relative_eq!(*v, e, epsilon = 1e-9);
        }
        assert_eq!(combined.strategy, CombinationStrategy::Weighted);
        assert_eq!(combined.timestamps, records[0].timestamps());
        assert_eq!(combined.weights, weights);
        assert_eq!(combined.uncertainty_method, UncertaintyMethod::Variance);
        assert_relative_eq!(combined.uncertainty, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_combination_is_pure() {
        let records = records();
        let weights = equal_weights(&records);
        let combiner = EnsembleCombiner::new(CombinerConfig::default()).unwrap();
        let first = combiner.combine(&records, &weights).unwrap();
        let second = combiner.combine(&records, &weights).unwrap();
        assert_eq!(first, second);
        assert_eq!(weights.version(), 0);
    }

    #[test]
    fn test_intervals_from_model_spread() {
        let records = records();
        let weights = equal_weights(&records);
        let combined = EnsembleCombiner::new(CombinerConfig::default())
            .unwrap()
            .combine(&records, &weights)
            .unwrap();

        // all models agree at the first step
        assert_relative_eq!(combined.confidence_intervals[0].width(), 0.0);
        for (ci, v) in combined.confidence_intervals.iter().zip(&combined.values) {
            assert!(ci.lower <= *v && *v <= ci.upper);
            assert_relative_eq!(ci.confidence_level, 0.95);
        }
        assert!(combined.confidence_intervals[3].width() > combined.confidence_intervals[1].width());
    }

    #[test]
    fn test_contributions() {
        let records = records();
        let weights = equal_weights(&records);
        let combined = EnsembleCombiner::new(CombinerConfig::default())
            .unwrap()
            .combine(&records, &weights)
            .unwrap();

        assert_eq!(combined.model_contributions.len(), 3);
        for c in &combined.model_contributions {
            assert_relative_eq!(c.contribution, c.weight * c.performance * c.diversity);
            assert!((0.0..=1.0).contains(&c.diversity));
        }
    }

    #[test]
    fn test_stacking_requires_meta_model() {
        let records = records();
        let weights = equal_weights(&records);
        let combiner = EnsembleCombiner::new(CombinerConfig::default())
            .unwrap()
            .with_strategy(CombinationStrategy::Stacking);
        assert!(matches!(
            combiner.combine(&records, &weights),
            Err(VigiaError::Validation(_))
        ));

        let combined = combiner
            .with_meta_model(Arc::new(LinearMetaModel::averaging(3)))
            .combine(&records, &weights)
            .unwrap();
        assert_relative_eq!(combined.values[3], 102.0, epsilon = 1e-9);
    }

    #[test]
    fn test_record_outside_snapshot_rejected() {
        let records = records();
        let weights = EnsembleWeights::equal(
            vec![ModelKind::Arima, ModelKind::Prophet],
            WeightBounds::default(),
        )
        .unwrap();
        let err = align_weights(&records, &weights).unwrap_err();
        assert!(matches!(err, VigiaError::Validation(_)));
    }

    #[test]
    fn test_missing_snapshot_model_tolerated() {
        let records = records();
        let weights = EnsembleWeights::equal(
            vec![
                ModelKind::Arima,
                ModelKind::Prophet,
                ModelKind::Lstm,
                ModelKind::Transformer,
            ],
            WeightBounds::default(),
        )
        .unwrap();
        let aligned = align_weights(&records, &weights).unwrap();
        assert_eq!(aligned, vec![0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_invalid_config() {
        let config = CombinerConfig {
            interval_z: 0.0,
            ..CombinerConfig::default()
        };
        assert!(EnsembleCombiner::new(config).is_err());
    }
}
