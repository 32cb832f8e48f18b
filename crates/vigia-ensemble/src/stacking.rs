//! Stacked combination through a meta-model.

use ndarray::Array1;
use std::sync::Arc;
use vigia_traits::{ForecastRecord, MetaModel, Result, VigiaError};

use crate::combiner::{Combiner, check_inputs, value_matrix};

/// Stacking combiner: the base forecasts at each step are the feature row of
/// a fitted [`MetaModel`], whose prediction is the combined value.
///
/// Ensemble weights are not used by the meta-model; it learned its own
/// mixing when it was fitted. Every model must forecast every step.
#[derive(Debug, Clone)]
pub struct StackingCombiner {
    meta_model: Arc<dyn MetaModel>,
}

impl StackingCombiner {
    /// Wrap a fitted meta-model.
    pub fn new(meta_model: Arc<dyn MetaModel>) -> Self {
        Self { meta_model }
    }

    /// The wrapped meta-model.
    pub fn meta_model(&self) -> &dyn MetaModel {
        self.meta_model.as_ref()
    }
}

impl Combiner for StackingCombiner {
    fn combine(&self, records: &[ForecastRecord], weights: &[f64]) -> Result<Array1<f64>> {
        let horizon = check_inputs(records, weights)?;
        if self.meta_model.n_features() != records.len() {
            return Err(VigiaError::Validation(format!(
                "meta-model '{}' was fitted on {} models, got {}",
                self.meta_model.name(),
                self.meta_model.n_features(),
                records.len()
            )));
        }
        let matrix = value_matrix(records, horizon);

        let mut combined = Array1::zeros(horizon);
        for (t, column) in matrix.columns().into_iter().enumerate() {
            let features = column.to_vec();
            if features.iter().any(|f| !f.is_finite()) {
                return Err(VigiaError::Validation(format!(
                    "stacking needs every model at step {t}"
                )));
            }
            let value = self.meta_model.predict(&features)?;
            if !value.is_finite() {
                return Err(VigiaError::Range(format!(
                    "meta-model produced non-finite value at step {t}"
                )));
            }
            combined[t] = value;
        }

        Ok(combined)
    }

    fn name(&self) -> &str {
        "stacking"
    }
}
