//! Disagreement between forecasters.
//!
//! Diversity is what makes an ensemble worth having: two models that always
//! agree add nothing over one. The analyzer reports pairwise disagreement,
//! its mean over all pairs, and a per-model spread score used to weight
//! contributions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vigia_traits::{ForecastRecord, ModelKind, Result, VigiaError, stats, validate_ensemble};

use crate::combiner::value_matrix;

/// Diversity between one pair of models, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairwiseDiversity {
    /// First model of the pair
    pub first: ModelKind,
    /// Second model of the pair
    pub second: ModelKind,
    /// Normalized mean absolute difference
    pub score: f64,
}

/// Diversity summary of one set of forecast records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityReport {
    /// Every unordered pair, in record order
    pub pairwise: Vec<PairwiseDiversity>,
    /// Mean pairwise diversity
    pub aggregate: f64,
    /// Normalized variance of each model's own sequence
    pub individual: BTreeMap<ModelKind, f64>,
}

/// Computes pairwise and aggregate diversity. Pure, no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiversityAnalyzer;

impl DiversityAnalyzer {
    /// Minimum number of records for a diversity analysis.
    pub const MIN_MODELS: usize = 2;

    /// Analyze a set of records sharing one horizon.
    ///
    /// # Errors
    ///
    /// [`VigiaError::InsufficientModels`] for fewer than two records, and
    /// [`VigiaError::Validation`] if the records do not share a horizon.
    pub fn analyze(&self, records: &[ForecastRecord]) -> Result<DiversityReport> {
        if records.len() < Self::MIN_MODELS {
            return Err(VigiaError::InsufficientModels {
                required: Self::MIN_MODELS,
                actual: records.len(),
            });
        }
        let horizon = validate_ensemble(records)?;
        let matrix = value_matrix(records, horizon);

        let magnitudes: Vec<f64> = matrix
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .filter(|v| v.is_finite())
                    .fold(0.0f64, |m, v| m.max(v.abs()))
            })
            .collect();

        let mut pairwise = Vec::with_capacity(records.len() * (records.len() - 1) / 2);
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                let (sum, n) = matrix
                    .row(i)
                    .iter()
                    .zip(matrix.row(j).iter())
                    .filter(|(a, b)| a.is_finite() && b.is_finite())
                    .fold((0.0, 0usize), |(s, n), (a, b)| (s + (a - b).abs(), n + 1));
                let scale = (magnitudes[i] + magnitudes[j]) / 2.0;
                let score = if n == 0 || scale < stats::EPSILON {
                    0.0
                } else {
                    stats::unit_clamp(sum / n as f64 / scale)
                };
                pairwise.push(PairwiseDiversity {
                    first: records[i].model_id(),
                    second: records[j].model_id(),
                    score,
                });
            }
        }

        let aggregate = pairwise.iter().map(|p| p.score).sum::<f64>() / pairwise.len() as f64;

        let individual = records
            .iter()
            .map(|r| (r.model_id(), individual_diversity(r.values())))
            .collect();

        Ok(DiversityReport {
            pairwise,
            aggregate,
            individual,
        })
    }
}

/// Normalized variance `var / mean(|v|)^2`, clamped to [0, 1].
///
/// Scale-free, so a model forecasting prices in the hundreds is comparable to
/// one forecasting returns. Zero for constant or empty sequences.
pub fn individual_diversity(values: &[f64]) -> f64 {
    let var = stats::variance(values);
    if var < stats::EPSILON {
        return 0.0;
    }
    let abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    match stats::mean(&abs) {
        Some(m) if m > stats::EPSILON => stats::unit_clamp(var / (m * m)),
        _ => 1.0,
    }
}
