//! Weighted-average combination strategy.

use ndarray::Array1;
use vigia_traits::{ForecastRecord, Result, VigiaError, stats};

use crate::combiner::{Combiner, check_inputs, value_matrix};

/// Weighted combiner: `combined[t] = Σ w_i v_i[t] / Σ w_i` over the models
/// present at step `t`.
///
/// A model whose value at `t` is missing (`NaN`) drops out of that step and
/// the remaining weights are renormalized, so the combined value always lies
/// between the smallest and largest contributing value.
///
/// # Examples
///
/// ```rust,no_run
/// use vigia_ensemble::{Combiner, WeightedCombiner};
/// # fn records() -> Vec<vigia_traits::ForecastRecord> { unimplemented!() }
///
/// let records = records();
/// let weights = vec![1.0 / records.len() as f64; records.len()];
/// let combined = WeightedCombiner.combine(&records, &weights).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedCombiner;

impl Combiner for WeightedCombiner {
    fn combine(&self, records: &[ForecastRecord], weights: &[f64]) -> Result<Array1<f64>> {
        let horizon = check_inputs(records, weights)?;
        let matrix = value_matrix(records, horizon);

        let mut combined = Array1::zeros(horizon);
        for (t, column) in matrix.columns().into_iter().enumerate() {
            combined[t] = stats::weighted_mean(column.iter().copied().zip(weights.iter().copied()))
                .ok_or_else(|| {
                    VigiaError::InsufficientData(format!(
                        "no weighted model forecast step {t}"
                    ))
                })?;
        }

        Ok(combined)
    }

    fn name(&self) -> &str {
        "weighted"
    }
}
