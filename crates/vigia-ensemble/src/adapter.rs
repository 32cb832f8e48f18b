//! Adaptive ensemble weights.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;
use vigia_traits::{
    EnsembleWeights, ForecastRecord, ModelKind, Result, VigiaError, stats, validate_ensemble,
};

use crate::diversity::DiversityAnalyzer;

/// Configuration for [`WeightAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Fraction of the gap to the target weight closed per update, in (0, 1]
    pub adaptation_rate: f64,

    /// Number of performance scores kept per model
    pub performance_window: usize,

    /// Share of the performance score in the combined score
    pub performance_weight: f64,

    /// Share of the diversity score in the combined score
    pub diversity_weight: f64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            adaptation_rate: 0.1,
            performance_window: 50,
            performance_weight: 0.7,
            diversity_weight: 0.3,
        }
    }
}

impl AdapterConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.adaptation_rate > 0.0 && self.adaptation_rate <= 1.0) {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "adaptation_rate must lie in (0, 1], got {}",
                self.adaptation_rate
            )));
        }
        if self.performance_window == 0 {
            return Err(VigiaError::InvalidWeightConfig(
                "performance_window must be at least 1".to_string(),
            ));
        }
        let blend = self.performance_weight + self.diversity_weight;
        if self.performance_weight < 0.0
            || self.diversity_weight < 0.0
            || (blend - 1.0).abs() > stats::SUM_TOLERANCE
        {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "performance_weight and diversity_weight must be non-negative and sum to 1, got {} + {}",
                self.performance_weight, self.diversity_weight
            )));
        }
        Ok(())
    }
}

/// Moves ensemble weights toward each model's recent merit.
///
/// Keeps a rolling window of performance scores per model. Each
/// [`update`](Self::update):
///
/// 1. scores every model from its accuracy report and pushes the score into
///    its window; the rolling mean is its performance
/// 2. blends performance with the model's individual diversity
/// 3. normalizes the blend into target weights
/// 4. moves each current weight `adaptation_rate` of the way to its target
/// 5. projects the result onto the configured floor/ceiling and renormalizes
///
/// The returned snapshot is a new version; the input snapshot is untouched.
///
/// # Examples
///
/// ```rust,no_run
/// use vigia_ensemble::{AdapterConfig, WeightAdapter};
/// # fn records() -> Vec<vigia_traits::ForecastRecord> { unimplemented!() }
/// # fn weights() -> vigia_traits::EnsembleWeights { unimplemented!() }
///
/// let mut adapter = WeightAdapter::new(AdapterConfig::default()).unwrap();
/// let next = adapter.update(&records(), &weights()).unwrap();
/// assert_eq!(next.version(), weights().version() + 1);
/// ```
#[derive(Debug, Clone)]
pub struct WeightAdapter {
    config: AdapterConfig,
    history: HashMap<ModelKind, VecDeque<f64>>,
}

impl WeightAdapter {
    /// Create an adapter with empty performance history.
    ///
    /// # Errors
    ///
    /// [`VigiaError::InvalidWeightConfig`] if the configuration is out of range.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            history: HashMap::new(),
        })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Record a performance score for a model, evicting beyond the window.
    pub fn record_performance(&mut self, model: ModelKind, score: f64) {
        let window = self.config.performance_window;
        let history = self.history.entry(model).or_default();
        history.push_back(score);

        while history.len() > window {
            history.pop_front();
        }
    }

    /// Rolling mean performance of a model, if any score was recorded.
    pub fn rolling_performance(&self, model: ModelKind) -> Option<f64> {
        let history = self.history.get(&model)?;
        if history.is_empty() {
            return None;
        }
        Some(history.iter().sum::<f64>() / history.len() as f64)
    }

    /// Number of scores held for a model.
    pub fn history_len(&self, model: ModelKind) -> usize {
        self.history.get(&model).map_or(0, VecDeque::len)
    }

    /// Compute the next weight snapshot.
    ///
    /// `records` must cover exactly the models of `current`, in any order.
    ///
    /// # Errors
    ///
    /// - [`VigiaError::InvalidWeightConfig`] if the record models differ from
    ///   the snapshot models
    /// - [`VigiaError::InsufficientModels`] for fewer than two records
    /// - [`VigiaError::Validation`] if the records are inconsistent
    ///
    /// History is only touched once every check has passed.
    pub fn update(
        &mut self,
        records: &[ForecastRecord],
        current: &EnsembleWeights,
    ) -> Result<EnsembleWeights> {
        validate_ensemble(records)?;
        if records.len() != current.len() {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "{} records for {} weighted models",
                records.len(),
                current.len()
            )));
        }
        let covered: HashSet<ModelKind> = records.iter().map(ForecastRecord::model_id).collect();
        if let Some(missing) = current.models().iter().find(|m| !covered.contains(m)) {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "no forecast record for weighted model '{missing}'"
            )));
        }
        let diversity = DiversityAnalyzer.analyze(records)?;

        for record in records {
            self.record_performance(record.model_id(), record.accuracy().performance_score());
        }

        let combined: Vec<f64> = current
            .models()
            .iter()
            .map(|model| {
                let performance = self.rolling_performance(*model).unwrap_or(0.0);
                let div = diversity.individual.get(model).copied().unwrap_or(0.0);
                self.config.performance_weight * performance + self.config.diversity_weight * div
            })
            .collect();

        let total: f64 = combined.iter().sum();
        let n = combined.len() as f64;
        let target: Vec<f64> = if total > stats::EPSILON {
            combined.iter().map(|c| c / total).collect()
        } else {
            vec![1.0 / n; combined.len()]
        };

        let rate = self.config.adaptation_rate;
        let adapted: Vec<f64> = current
            .weights()
            .iter()
            .zip(&target)
            .map(|(w, t)| w + rate * (t - w))
            .collect();

        let next = current.next(&adapted)?;
        debug!(
            version = next.version(),
            rate,
            weights = ?next.weights(),
            "adapted ensemble weights"
        );
        Ok(next)
    }
}

/// One-shot weight update with a fresh adapter.
///
/// Without history the rolling performance is just this cycle's score.
pub fn update_weights(
    records: &[ForecastRecord],
    current: &EnsembleWeights,
    adaptation_rate: f64,
) -> Result<EnsembleWeights> {
    let mut adapter = WeightAdapter::new(AdapterConfig {
        adaptation_rate,
        ..AdapterConfig::default()
    })?;
    adapter.update(records, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{accuracy, record, record_with_accuracy};
    use approx::assert_relative_eq;
    use vigia_traits::WeightBounds;

    fn three_models() -> Vec<ForecastRecord> {
        vec![
            record(ModelKind::Arima, &[100.0, 101.0, 102.0, 103.0]),
            record(ModelKind::Prophet, &[100.0, 99.0, 98.0, 97.0]),
            record(ModelKind::Lstm, &[100.0, 102.0, 104.0, 106.0]),
        ]
    }

    fn equal(models: &[ForecastRecord]) -> EnsembleWeights {
        EnsembleWeights::equal(
            models.iter().map(ForecastRecord::model_id).collect(),
            WeightBounds::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_config_validation() {
        let mut config = AdapterConfig::default();
        assert!(config.validate().is_ok());
        config.adaptation_rate = 0.0;
        assert!(config.validate().is_err());
        config.adaptation_rate = 1.5;
        assert!(config.validate().is_err());
        config = AdapterConfig {
            performance_window: 0,
            ..AdapterConfig::default()
        };
        assert!(matches!(
            WeightAdapter::new(config),
            Err(VigiaError::InvalidWeightConfig(_))
        ));
    }

    #[test]
    fn test_update_preserves_distribution() {
        let records = three_models();
        let current = equal(&records);
        let mut adapter = WeightAdapter::new(AdapterConfig::default()).unwrap();

        let next = adapter.update(&records, &current).unwrap();
        assert_eq!(next.version(), 1);
        assert_relative_eq!(next.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        let bounds = next.bounds();
        assert!(next.weights().iter().all(|w| bounds.contains(*w)));
    }

    #[test]
    fn test_better_model_gains_weight() {
        let mut strong = accuracy();
        strong.directional_accuracy = 0.95;
        strong.r2 = 0.9;
        let mut weak = accuracy();
        weak.directional_accuracy = 0.3;
        weak.r2 = 0.0;

        let records = vec![
            record_with_accuracy(ModelKind::Arima, &[10.0, 11.0, 12.0], strong),
            record_with_accuracy(ModelKind::Prophet, &[10.0, 11.0, 12.0], weak),
        ];
        let current = equal(&records);
        let mut adapter = WeightAdapter::new(AdapterConfig {
            adaptation_rate: 0.5,
            ..AdapterConfig::default()
        })
        .unwrap();

        let next = adapter.update(&records, &current).unwrap();
        let arima = next.weight_of(ModelKind::Arima).unwrap();
        let prophet = next.weight_of(ModelKind::Prophet).unwrap();
        assert!(arima > 0.5);
        assert!(prophet < 0.5);
    }

    #[test]
    fn test_step_bounded_by_rate() {
        let mut strong = accuracy();
        strong.directional_accuracy = 1.0;
        let mut weak = accuracy();
        weak.directional_accuracy = 0.0;
        let records = vec![
            record_with_accuracy(ModelKind::Arima, &[10.0, 11.0], strong),
            record_with_accuracy(ModelKind::Prophet, &[10.0, 11.0], weak),
        ];
        let bounds = WeightBounds {
            min_weight: 0.0,
            max_weight: 1.0,
        };
        let current = EnsembleWeights::equal(
            vec![ModelKind::Arima, ModelKind::Prophet],
            bounds,
        )
        .unwrap();
        let rate = 0.2;
        let next = update_weights(&records, &current, rate).unwrap();

        // identical sequences share one diversity score
        let d = crate::diversity::individual_diversity(&[10.0, 11.0]);
        let cs = 0.7 * strong.performance_score() + 0.3 * d;
        let cw = 0.7 * weak.performance_score() + 0.3 * d;
        let target = cs / (cs + cw);
        let expected = 0.5 + rate * (target - 0.5);
        assert_relative_eq!(next.weights()[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_rolling_window_eviction() {
        let mut adapter = WeightAdapter::new(AdapterConfig {
            performance_window: 3,
            ..AdapterConfig::default()
        })
        .unwrap();
        for score in [0.1, 0.2, 0.3, 0.4, 0.5] {
            adapter.record_performance(ModelKind::Lstm, score);
        }
        assert_eq!(adapter.history_len(ModelKind::Lstm), 3);
        assert_relative_eq!(adapter.rolling_performance(ModelKind::Lstm).unwrap(), 0.4);
        assert!(adapter.rolling_performance(ModelKind::Arima).is_none());
    }

    #[test]
    fn test_update_rejects_model_mismatch() {
        let records = three_models();
        let current = EnsembleWeights::equal(
            vec![ModelKind::Arima, ModelKind::Prophet, ModelKind::Transformer],
            WeightBounds::default(),
        )
        .unwrap();
        let mut adapter = WeightAdapter::new(AdapterConfig::default()).unwrap();
        let err = adapter.update(&records, &current).unwrap_err();
        assert!(matches!(err, VigiaError::InvalidWeightConfig(_)));
        // fail-fast: no history recorded
        assert_eq!(adapter.history_len(ModelKind::Arima), 0);

        let two = &records[..2];
        assert!(adapter.update(two, &current).is_err());
    }

    #[test]
    fn test_repeated_updates_converge_toward_target() {
        let records = three_models();
        let mut weights = equal(&records);
        let mut adapter = WeightAdapter::new(AdapterConfig::default()).unwrap();
        let mut last_gap = f64::INFINITY;
        let mut previous = weights.weights().to_vec();
        for _ in 0..20 {
            weights = adapter.update(&records, &weights).unwrap();
            let gap: f64 = weights
                .weights()
                .iter()
                .zip(&previous)
                .map(|(a, b)| (a - b).abs())
                .sum();
            assert!(gap <= last_gap + 1e-12);
            last_gap = gap;
            previous = weights.weights().to_vec();
        }
        assert_eq!(weights.version(), 20);
    }
}
