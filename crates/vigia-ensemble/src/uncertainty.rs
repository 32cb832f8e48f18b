//! Scalar uncertainty for combined forecasts.
//!
//! Three interchangeable methods:
//! - **Variance**: mean of each model's own forecast-sequence variance
//! - **Bootstrap**: spread of the combined mean over resampled model sets
//! - **Conformal**: quantile of historical absolute residuals
//!
//! Every method returns a finite, non-negative number.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};
use vigia_traits::{ForecastRecord, Result, VigiaError, stats};

use crate::combiner::Combiner;

/// Uncertainty method, selected by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum UncertaintyMethod {
    /// Mean within-model variance
    Variance,
    /// Standard deviation of combined means over resampled model sets
    Bootstrap {
        /// Number of resamples
        samples: usize,
        /// RNG seed; a fixed seed makes the estimate reproducible
        seed: u64,
    },
    /// Conformal quantile of absolute residuals
    Conformal {
        /// Miscoverage level; the estimate is the `1 - alpha` quantile
        alpha: f64,
    },
}

impl Default for UncertaintyMethod {
    fn default() -> Self {
        Self::Variance
    }
}

impl UncertaintyMethod {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Variance => Ok(()),
            Self::Bootstrap { samples, .. } if *samples < 2 => Err(VigiaError::Validation(
                format!("bootstrap needs at least 2 samples, got {samples}"),
            )),
            Self::Bootstrap { .. } => Ok(()),
            Self::Conformal { alpha } if !(*alpha > 0.0 && *alpha < 1.0) => Err(
                VigiaError::Validation(format!("conformal alpha must lie in (0, 1), got {alpha}")),
            ),
            Self::Conformal { .. } => Ok(()),
        }
    }
}

/// Bounded history of absolute residuals between combined forecasts and
/// realized values.
///
/// Immutable: [`with_residual`](Self::with_residual) returns the next
/// snapshot and leaves `self` unchanged. The oldest residual is evicted once
/// the capacity is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSet {
    residuals: VecDeque<f64>,
    capacity: usize,
}

impl Default for CalibrationSet {
    fn default() -> Self {
        Self::new(500)
    }
}

impl CalibrationSet {
    /// Empty calibration set holding at most `capacity` residuals.
    pub fn new(capacity: usize) -> Self {
        Self {
            residuals: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot with one more `(forecast, realized)` residual.
    ///
    /// # Errors
    ///
    /// [`VigiaError::Validation`] if either value is not finite.
    pub fn with_residual(&self, forecast: f64, realized: f64) -> Result<Self> {
        if !forecast.is_finite() || !realized.is_finite() {
            return Err(VigiaError::Validation(format!(
                "calibration pair must be finite, got ({forecast}, {realized})"
            )));
        }
        let mut next = self.clone();
        next.residuals.push_back((forecast - realized).abs());
        while next.residuals.len() > next.capacity {
            next.residuals.pop_front();
        }
        Ok(next)
    }

    /// Snapshot with every pair of `pairs` appended in order.
    pub fn with_residuals(&self, pairs: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        pairs
            .into_iter()
            .try_fold(self.clone(), |set, (f, r)| set.with_residual(f, r))
    }

    /// Number of residuals held.
    pub fn len(&self) -> usize {
        self.residuals.len()
    }

    /// Whether no residual has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.residuals.is_empty()
    }

    /// Maximum number of residuals kept.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Conformal `(1 - alpha)` quantile of the absolute residuals.
    ///
    /// # Errors
    ///
    /// [`VigiaError::EmptyCalibrationSet`] if no residual has been recorded.
    pub fn quantile(&self, alpha: f64) -> Result<f64> {
        let residuals: Vec<f64> = self.residuals.iter().copied().collect();
        stats::conformal_quantile(&residuals, alpha).ok_or(VigiaError::EmptyCalibrationSet)
    }
}

/// An uncertainty value and the method that actually produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyEstimate {
    /// Method used (may differ from the configured one after a fallback)
    pub method: UncertaintyMethod,
    /// Finite, non-negative uncertainty
    pub value: f64,
}

/// Attaches a scalar uncertainty to a combination.
#[derive(Debug, Clone, Default)]
pub struct UncertaintyQuantifier {
    method: UncertaintyMethod,
}

impl UncertaintyQuantifier {
    /// Create a quantifier for one method.
    pub const fn new(method: UncertaintyMethod) -> Self {
        Self { method }
    }

    /// Configured method.
    pub const fn method(&self) -> &UncertaintyMethod {
        &self.method
    }

    /// Compute the uncertainty with the configured method.
    ///
    /// `combiner` and `weights` are only used by the bootstrap method;
    /// `calibration` only by the conformal method.
    ///
    /// # Errors
    ///
    /// - [`VigiaError::EmptyCalibrationSet`] for conformal without history
    /// - [`VigiaError::InsufficientData`] if no bootstrap resample combined
    pub fn quantify(
        &self,
        records: &[ForecastRecord],
        weights: &[f64],
        combiner: &dyn Combiner,
        calibration: Option<&CalibrationSet>,
    ) -> Result<f64> {
        self.method.validate()?;
        let value = match &self.method {
            UncertaintyMethod::Variance => variance_uncertainty(records)?,
            UncertaintyMethod::Bootstrap { samples, seed } => {
                bootstrap_uncertainty(records, weights, combiner, *samples, *seed)?
            }
            UncertaintyMethod::Conformal { alpha } => calibration
                .ok_or(VigiaError::EmptyCalibrationSet)?
                .quantile(*alpha)?,
        };
        if !value.is_finite() || value < 0.0 {
            return Err(VigiaError::Range(format!(
                "uncertainty must be finite and non-negative, got {value}"
            )));
        }
        Ok(value)
    }

    /// Like [`quantify`](Self::quantify), but an empty calibration set falls
    /// back to the variance method instead of failing.
    pub fn quantify_with_fallback(
        &self,
        records: &[ForecastRecord],
        weights: &[f64],
        combiner: &dyn Combiner,
        calibration: Option<&CalibrationSet>,
    ) -> Result<UncertaintyEstimate> {
        match self.quantify(records, weights, combiner, calibration) {
            Ok(value) => Ok(UncertaintyEstimate {
                method: self.method.clone(),
                value,
            }),
            Err(VigiaError::EmptyCalibrationSet) => {
                warn!("calibration set is empty, falling back to variance uncertainty");
                Ok(UncertaintyEstimate {
                    method: UncertaintyMethod::Variance,
                    value: variance_uncertainty(records)?,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Mean of each model's own forecast-sequence variance.
pub fn variance_uncertainty(records: &[ForecastRecord]) -> Result<f64> {
    if records.is_empty() {
        return Err(VigiaError::InsufficientModels {
            required: 1,
            actual: 0,
        });
    }
    let total: f64 = records.iter().map(|r| stats::variance(r.values())).sum();
    Ok(total / records.len() as f64)
}

/// Standard deviation of the combined mean over `samples` resamples of the
/// record set, drawn with replacement from a seeded RNG.
///
/// A resample that cannot be combined (for example every drawn model is
/// missing one step) is skipped.
pub fn bootstrap_uncertainty(
    records: &[ForecastRecord],
    weights: &[f64],
    combiner: &dyn Combiner,
    samples: usize,
    seed: u64,
) -> Result<f64> {
    if records.is_empty() || weights.len() != records.len() {
        return Err(VigiaError::Validation(format!(
            "bootstrap needs one weight per record, got {} records and {} weights",
            records.len(),
            weights.len()
        )));
    }
    let n = records.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut means = Vec::with_capacity(samples);
    let mut skipped = 0usize;

    for _ in 0..samples {
        let picks: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        let drawn: Vec<ForecastRecord> = picks.iter().map(|&i| records[i].clone()).collect();
        let drawn_weights: Vec<f64> = picks.iter().map(|&i| weights[i]).collect();

        match combiner.combine(&drawn, &drawn_weights) {
            Ok(values) => match stats::mean(&values.to_vec()) {
                Some(m) => means.push(m),
                None => skipped += 1,
            },
            Err(_) => skipped += 1,
        }
    }

    if means.is_empty() {
        return Err(VigiaError::InsufficientData(
            "no bootstrap resample could be combined".to_string(),
        ));
    }
    debug!(
        combiner = combiner.name(),
        samples,
        skipped,
        "bootstrap uncertainty"
    );
    Ok(stats::std_dev(&means))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use crate::weighted::WeightedCombiner;
    use approx::assert_relative_eq;
    use vigia_traits::ModelKind;

    fn records() -> Vec<ForecastRecord> {
        vec![
            record(ModelKind::Arima, &[100.0, 101.0, 102.0, 103.0]),
            record(ModelKind::Prophet, &[100.0, 99.0, 98.0, 97.0]),
            record(ModelKind::Lstm, &[100.0, 102.0, 104.0, 106.0]),
        ]
    }

    #[test]
    fn test_variance_method() {
        let value = variance_uncertainty(&records()).unwrap();
        // variances: 1.25, 1.25, 5.0
        assert_relative_eq!(value, 7.5 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bootstrap_is_deterministic_for_seed() {
        let recs = records();
        let w = [1.0 / 3.0; 3];
        let a = bootstrap_uncertainty(&recs, &w, &WeightedCombiner, 200, 7).unwrap();
        let b = bootstrap_uncertainty(&recs, &w, &WeightedCombiner, 200, 7).unwrap();
        assert_relative_eq!(a, b);
        assert!(a.is_finite() && a >= 0.0);
    }

    #[test]
    fn test_bootstrap_identical_models_zero_spread() {
        let recs = vec![
            record(ModelKind::Arima, &[5.0, 6.0]),
            record(ModelKind::Prophet, &[5.0, 6.0]),
        ];
        let value = bootstrap_uncertainty(&recs, &[0.5, 0.5], &WeightedCombiner, 50, 1).unwrap();
        assert_relative_eq!(value, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calibration_set_snapshots() {
        let empty = CalibrationSet::new(3);
        let one = empty.with_residual(10.0, 12.0).unwrap();
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);

        let full = one
            .with_residuals([(1.0, 1.5), (2.0, 2.1), (3.0, 3.4)])
            .unwrap();
        assert_eq!(full.len(), 3);
        // the 2.0 residual was evicted; max is now 0.5
        assert_relative_eq!(full.quantile(0.1).unwrap(), 0.5);
        assert!(empty.with_residual(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_conformal_requires_history() {
        let quantifier = UncertaintyQuantifier::new(UncertaintyMethod::Conformal { alpha: 0.1 });
        let recs = records();
        let w = [1.0 / 3.0; 3];
        let err = quantifier
            .quantify(&recs, &w, &WeightedCombiner, Some(&CalibrationSet::default()))
            .unwrap_err();
        assert!(matches!(err, VigiaError::EmptyCalibrationSet));

        let fallback = quantifier
            .quantify_with_fallback(&recs, &w, &WeightedCombiner, None)
            .unwrap();
        assert_eq!(fallback.method, UncertaintyMethod::Variance);
        assert_relative_eq!(fallback.value, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_conformal_quantile_of_residuals() {
        let set = CalibrationSet::default()
            .with_residuals([(1.0, 1.1), (1.0, 1.2), (1.0, 1.3), (1.0, 1.4)])
            .unwrap();
        let quantifier = UncertaintyQuantifier::new(UncertaintyMethod::Conformal { alpha: 0.5 });
        let recs = records();
        let value = quantifier
            .quantify(&recs, &[1.0 / 3.0; 3], &WeightedCombiner, Some(&set))
            .unwrap();
        // rank ceil(5 * 0.5) = 3 -> third smallest residual
        assert_relative_eq!(value, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_method_validation() {
        assert!(
            UncertaintyMethod::Bootstrap {
                samples: 1,
                seed: 0
            }
            .validate()
            .is_err()
        );
        assert!(UncertaintyMethod::Conformal { alpha: 1.0 }.validate().is_err());
        assert!(UncertaintyMethod::Variance.validate().is_ok());
    }

    #[test]
    fn test_method_serde_tagged() {
        let json = serde_json::to_string(&UncertaintyMethod::Bootstrap {
            samples: 10,
            seed: 3,
        })
        .unwrap();
        assert_eq!(json, r#"{"method":"bootstrap","samples":10,"seed":3}"#);
    }
}
