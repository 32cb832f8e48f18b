//! Meta-model seam for stacked ensembles.
//!
//! A stacking combiner feeds the per-model forecasts at one step into a
//! [`MetaModel`] and takes its output as the combined value. How the
//! meta-model was fitted is up to the implementor; only prediction is part
//! of the contract.

use serde::{Deserialize, Serialize};

use crate::{Result, VigiaError};

/// A fitted model mapping base-model outputs to one combined value.
///
/// Implementations must be thread-safe (`Send + Sync`) so a combiner can be
/// shared across analysis tasks.
///
/// # Example
///
/// ```
/// use vigia_traits::{MetaModel, Result};
///
/// #[derive(Debug)]
/// struct Median;
///
/// impl MetaModel for Median {
///     fn predict(&self, features: &[f64]) -> Result<f64> {
///         let mut sorted = features.to_vec();
///         sorted.sort_by(f64::total_cmp);
///         Ok(sorted[sorted.len() / 2])
///     }
///
///     fn n_features(&self) -> usize {
///         3
///     }
/// }
///
/// assert_eq!(Median.predict(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
/// ```
pub trait MetaModel: Send + Sync + std::fmt::Debug {
    /// Predict the combined value from one feature row.
    ///
    /// The row holds one forecast per base model, in record order.
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Number of features the model was fitted on.
    fn n_features(&self) -> usize;

    /// Name of the meta-model, for logging.
    fn name(&self) -> &str {
        "meta_model"
    }
}

/// Linear meta-model: `intercept + sum(coefficients[i] * features[i])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearMetaModel {
    /// Constant term
    pub intercept: f64,
    /// One coefficient per base model
    pub coefficients: Vec<f64>,
}

impl LinearMetaModel {
    /// Create a linear meta-model.
    pub const fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    /// Plain average of `n` base models.
    pub fn averaging(n: usize) -> Self {
        Self::new(0.0, vec![1.0 / n.max(1) as f64; n])
    }
}

impl MetaModel for LinearMetaModel {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(VigiaError::Validation(format!(
                "meta-model expects {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }
        if features.iter().any(|f| !f.is_finite()) {
            return Err(VigiaError::Validation(
                "meta-model features must be finite".to_string(),
            ));
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, f)| c * f)
                .sum::<f64>())
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn name(&self) -> &str {
        "linear"
    }
}
