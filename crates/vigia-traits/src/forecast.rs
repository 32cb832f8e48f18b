//! Forecast data contracts.
//!
//! A [`ForecastRecord`] is the only thing the ensemble needs from a forecasting
//! model: point values over a horizon, their timestamps and intervals, and an
//! accuracy report from the model's own validation. How the model was fitted
//! is not visible here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Result, VigiaError, stats::unit_clamp};

/// Closed set of forecaster kinds that can take part in an ensemble.
///
/// Adding a forecaster means adding a variant here; every variant produces
/// the same [`ForecastRecord`] contract.
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
pub enum ModelKind {
    /// Autoregressive integrated moving average
    #[display("arima")]
    Arima,
    /// Additive trend/seasonality decomposition
    #[display("prophet")]
    Prophet,
    /// Recurrent neural network
    #[display("lstm")]
    Lstm,
    /// Attention-based sequence model
    #[display("transformer")]
    Transformer,
    /// Gradient-boosted trees over lagged features
    #[display("gradient_boosting")]
    GradientBoosting,
}

impl ModelKind {
    /// All forecaster kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Arima,
        Self::Prophet,
        Self::Lstm,
        Self::Transformer,
        Self::GradientBoosting,
    ];
}

/// Out-of-sample accuracy of one forecaster.
///
/// `mape` and `rmse` are expected as fractions of the target scale, so that
/// `1 - mape` and `1 - rmse` are meaningful quality scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// Mean absolute error
    pub mae: f64,
    /// Mean squared error
    pub mse: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute percentage error (fraction)
    pub mape: f64,
    /// Coefficient of determination, at most 1
    pub r2: f64,
    /// Share of steps where forecast and actual moved the same way, in [0, 1]
    pub directional_accuracy: f64,
}

impl AccuracyReport {
    /// Blend weight of directional accuracy in [`Self::performance_score`].
    pub const DIRECTIONAL_WEIGHT: f64 = 0.4;
    /// Blend weight of r2.
    pub const R2_WEIGHT: f64 = 0.3;
    /// Blend weight of `1 - mape`.
    pub const MAPE_WEIGHT: f64 = 0.2;
    /// Blend weight of `1 - rmse`.
    pub const RMSE_WEIGHT: f64 = 0.1;

    /// Check the documented bounds of every field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("mae", self.mae),
            ("mse", self.mse),
            ("rmse", self.rmse),
            ("mape", self.mape),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(VigiaError::Validation(format!(
                    "accuracy.{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.r2.is_nan() || self.r2 > 1.0 {
            return Err(VigiaError::Validation(format!(
                "accuracy.r2 must be at most 1, got {}",
                self.r2
            )));
        }
        if !(0.0..=1.0).contains(&self.directional_accuracy) {
            return Err(VigiaError::Validation(format!(
                "accuracy.directional_accuracy must lie in [0, 1], got {}",
                self.directional_accuracy
            )));
        }
        Ok(())
    }

    /// Single quality score in [0, 1].
    ///
    /// Each component is clamped to the unit interval before blending, so a
    /// hugely negative r2 cannot drag the score below zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigia_traits::AccuracyReport;
    ///
    /// let report = AccuracyReport {
    ///     mae: 0.5, mse: 0.3, rmse: 0.2, mape: 0.1, r2: 0.5, directional_accuracy: 0.7,
    /// };
    /// // 0.4*0.7 + 0.3*0.5 + 0.2*0.9 + 0.1*0.8
    /// assert!((report.performance_score() - 0.69).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn performance_score(&self) -> f64 {
        Self::DIRECTIONAL_WEIGHT * unit_clamp(self.directional_accuracy)
            + Self::R2_WEIGHT * unit_clamp(self.r2)
            + Self::MAPE_WEIGHT * unit_clamp(1.0 - self.mape)
            + Self::RMSE_WEIGHT * unit_clamp(1.0 - self.rmse)
    }
}

/// Prediction interval for one forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Nominal coverage, in (0, 1)
    pub confidence_level: f64,
}

impl ConfidenceInterval {
    /// Symmetric interval `center ± half_width`.
    #[must_use]
    pub fn symmetric(center: f64, half_width: f64, confidence_level: f64) -> Self {
        Self {
            lower: center - half_width,
            upper: center + half_width,
            confidence_level,
        }
    }

    /// Interval width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Output of one forecasting model for one analysis cycle.
///
/// Immutable once built: fields are private and only [`ForecastRecord::new`]
/// can create one, after validating every shape invariant. A point value may
/// be `NaN` to mark a step the model did not forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForecastRecord")]
pub struct ForecastRecord {
    model_id: ModelKind,
    values: Vec<f64>,
    timestamps: Vec<DateTime<Utc>>,
    confidence_intervals: Vec<ConfidenceInterval>,
    accuracy: AccuracyReport,
}

#[derive(Deserialize)]
struct RawForecastRecord {
    model_id: ModelKind,
    values: Vec<Option<f64>>,
    timestamps: Vec<DateTime<Utc>>,
    confidence_intervals: Vec<ConfidenceInterval>,
    accuracy: AccuracyReport,
}

impl TryFrom<RawForecastRecord> for ForecastRecord {
    type Error = VigiaError;

    fn try_from(raw: RawForecastRecord) -> Result<Self> {
        // JSON has no NaN; `null` marks a missing step.
        let values = raw
            .values
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Self::new(
            raw.model_id,
            values,
            raw.timestamps,
            raw.confidence_intervals,
            raw.accuracy,
        )
    }
}

impl ForecastRecord {
    /// Build a record, validating its internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`VigiaError::Validation`] if:
    /// - the horizon is empty or the three sequences differ in length
    /// - timestamps are not strictly increasing
    /// - a value is infinite
    /// - an interval is inverted or has a level outside (0, 1)
    /// - the accuracy report violates its bounds
    pub fn new(
        model_id: ModelKind,
        values: Vec<f64>,
        timestamps: Vec<DateTime<Utc>>,
        confidence_intervals: Vec<ConfidenceInterval>,
        accuracy: AccuracyReport,
    ) -> Result<Self> {
        let horizon = values.len();
        if horizon == 0 {
            return Err(VigiaError::Validation(format!(
                "{model_id}: forecast horizon must be at least 1"
            )));
        }
        if timestamps.len() != horizon || confidence_intervals.len() != horizon {
            return Err(VigiaError::Validation(format!(
                "{model_id}: {} values, {} timestamps and {} intervals must have equal length",
                horizon,
                timestamps.len(),
                confidence_intervals.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VigiaError::Validation(format!(
                "{model_id}: timestamps must be strictly increasing"
            )));
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(VigiaError::Validation(format!(
                "{model_id}: forecast values must be finite or NaN for a missing step"
            )));
        }
        for (t, ci) in confidence_intervals.iter().enumerate() {
            if ci.lower.is_nan() || ci.upper.is_nan() || ci.lower > ci.upper {
                return Err(VigiaError::Validation(format!(
                    "{model_id}: interval at step {t} is inverted ({}, {})",
                    ci.lower, ci.upper
                )));
            }
            if !(ci.confidence_level > 0.0 && ci.confidence_level < 1.0) {
                return Err(VigiaError::Validation(format!(
                    "{model_id}: confidence level at step {t} must lie in (0, 1), got {}",
                    ci.confidence_level
                )));
            }
        }
        accuracy.validate()?;

        Ok(Self {
            model_id,
            values,
            timestamps,
            confidence_intervals,
            accuracy,
        })
    }

    /// The forecaster that produced this record.
    pub const fn model_id(&self) -> ModelKind {
        self.model_id
    }

    /// Point forecasts, one per horizon step.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Forecast timestamps, strictly increasing.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Per-step prediction intervals.
    pub fn confidence_intervals(&self) -> &[ConfidenceInterval] {
        &self.confidence_intervals
    }

    /// Accuracy report of the forecaster.
    pub const fn accuracy(&self) -> &AccuracyReport {
        &self.accuracy
    }

    /// Forecast horizon `H`.
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    /// Value at step `t`, or `None` if the model left that step missing.
    pub fn value_at(&self, t: usize) -> Option<f64> {
        self.values.get(t).copied().filter(|v| v.is_finite())
    }
}

/// Check the cross-record invariants of one ensemble call.
///
/// All records must share the same horizon and identical timestamps, and no
/// forecaster may appear twice. Returns the common horizon.
///
/// # Errors
///
/// [`VigiaError::InsufficientModels`] when `records` is empty and
/// [`VigiaError::Validation`] on any mismatch.
pub fn validate_ensemble(records: &[ForecastRecord]) -> Result<usize> {
    let first = records.first().ok_or(VigiaError::InsufficientModels {
        required: 1,
        actual: 0,
    })?;
    let horizon = first.horizon();
    let mut seen = HashSet::with_capacity(records.len());

    for record in records {
        if !seen.insert(record.model_id) {
            return Err(VigiaError::Validation(format!(
                "model '{}' appears more than once",
                record.model_id
            )));
        }
        if record.horizon() != horizon {
            return Err(VigiaError::Validation(format!(
                "model '{}' has horizon {}, expected {}",
                record.model_id,
                record.horizon(),
                horizon
            )));
        }
        if record.timestamps != first.timestamps {
            return Err(VigiaError::Validation(format!(
                "model '{}' timestamps differ from model '{}'",
                record.model_id, first.model_id
            )));
        }
    }

    Ok(horizon)
}
