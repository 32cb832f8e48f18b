//! Ensemble weight snapshots.
//!
//! [`EnsembleWeights`] is a versioned, immutable snapshot. Adapting the
//! weights never edits a snapshot in place; it produces the next version, so
//! readers holding an older snapshot always see a consistent distribution.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{ModelKind, Result, VigiaError, stats::SUM_TOLERANCE};

/// Floor and ceiling applied to every model weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    /// Minimum weight any model may hold
    pub min_weight: f64,
    /// Maximum weight any model may hold
    pub max_weight: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            min_weight: 0.05,
            max_weight: 0.60,
        }
    }
}

impl WeightBounds {
    /// Check that the bounds admit a distribution over `n_models` models.
    ///
    /// # Errors
    ///
    /// [`VigiaError::InvalidWeightConfig`] if the bounds are not ordered
    /// within [0, 1] or if `n * min > 1` or `n * max < 1`.
    pub fn validate(&self, n_models: usize) -> Result<()> {
        let Self {
            min_weight,
            max_weight,
        } = *self;
        if !(0.0..=1.0).contains(&min_weight)
            || !(0.0..=1.0).contains(&max_weight)
            || min_weight > max_weight
        {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "weight bounds [{min_weight}, {max_weight}] must be ordered within [0, 1]"
            )));
        }
        let n = n_models as f64;
        if n * min_weight > 1.0 + SUM_TOLERANCE || n * max_weight < 1.0 - SUM_TOLERANCE {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "bounds [{min_weight}, {max_weight}] cannot hold a distribution over {n_models} models"
            )));
        }
        Ok(())
    }

    /// Whether `w` lies inside the bounds, with tolerance.
    #[must_use]
    pub fn contains(&self, w: f64) -> bool {
        w >= self.min_weight - SUM_TOLERANCE && w <= self.max_weight + SUM_TOLERANCE
    }

    /// Project `weights` onto `{w : sum(w) = 1, min <= w_i <= max}`.
    ///
    /// Clamps every weight, then rescales the still-free weights so the
    /// vector sums to one; weights pushed past a bound by the rescale are
    /// pinned and the remainder redistributed. Each round pins at least one
    /// weight, so the loop ends within `n` rounds. Callers must have
    /// validated the bounds for `weights.len()` models.
    #[must_use]
    pub fn project(&self, weights: &[f64]) -> Vec<f64> {
        let n = weights.len();
        let mut out: Vec<f64> = weights
            .iter()
            .map(|w| {
                if w.is_finite() {
                    w.clamp(self.min_weight, self.max_weight)
                } else {
                    self.min_weight
                }
            })
            .collect();
        let mut pinned = vec![false; n];

        for _ in 0..=n {
            let pinned_mass: f64 = out
                .iter()
                .zip(&pinned)
                .filter(|(_, p)| **p)
                .map(|(w, _)| w)
                .sum();
            let free_mass: f64 = out
                .iter()
                .zip(&pinned)
                .filter(|(_, p)| !**p)
                .map(|(w, _)| w)
                .sum();
            let free_count = pinned.iter().filter(|p| !**p).count();
            if free_count == 0 {
                break;
            }

            let target = 1.0 - pinned_mass;
            if free_mass > f64::EPSILON {
                let scale = target / free_mass;
                for (w, p) in out.iter_mut().zip(&pinned) {
                    if !*p {
                        *w *= scale;
                    }
                }
            } else {
                let share = target / free_count as f64;
                for (w, p) in out.iter_mut().zip(&pinned) {
                    if !*p {
                        *w = share;
                    }
                }
            }

            let mut violated = false;
            for (w, p) in out.iter_mut().zip(pinned.iter_mut()) {
                if *p {
                    continue;
                }
                if *w > self.max_weight {
                    *w = self.max_weight;
                    *p = true;
                    violated = true;
                } else if *w < self.min_weight {
                    *w = self.min_weight;
                    *p = true;
                    violated = true;
                }
            }
            if !violated {
                break;
            }
        }

        out
    }
}

/// Versioned weight vector over the models of one ensemble.
///
/// Invariants, checked on construction and preserved by
/// [`EnsembleWeights::next`]: one weight per distinct model, every weight in
/// `[min_weight, max_weight]`, and the weights sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnsembleWeights")]
pub struct EnsembleWeights {
    models: Vec<ModelKind>,
    weights: Vec<f64>,
    bounds: WeightBounds,
    version: u64,
}

#[derive(Deserialize)]
struct RawEnsembleWeights {
    models: Vec<ModelKind>,
    weights: Vec<f64>,
    bounds: WeightBounds,
    #[serde(default)]
    version: u64,
}

impl TryFrom<RawEnsembleWeights> for EnsembleWeights {
    type Error = VigiaError;

    fn try_from(raw: RawEnsembleWeights) -> Result<Self> {
        Self::checked(raw.models, raw.weights, raw.bounds, raw.version)
    }
}

impl EnsembleWeights {
    /// Create the initial snapshot (version 0).
    ///
    /// # Errors
    ///
    /// [`VigiaError::InvalidWeightConfig`] if lengths differ, a model repeats,
    /// the weights do not sum to one, a weight breaks the bounds, or the
    /// bounds are infeasible.
    pub fn new(models: Vec<ModelKind>, weights: Vec<f64>, bounds: WeightBounds) -> Result<Self> {
        Self::checked(models, weights, bounds, 0)
    }

    /// Equal weights `1/n` over `models`.
    pub fn equal(models: Vec<ModelKind>, bounds: WeightBounds) -> Result<Self> {
        if models.is_empty() {
            return Err(VigiaError::InvalidWeightConfig(
                "at least one model is required".to_string(),
            ));
        }
        let w = 1.0 / models.len() as f64;
        let weights = vec![w; models.len()];
        Self::new(models, weights, bounds)
    }

    fn checked(
        models: Vec<ModelKind>,
        weights: Vec<f64>,
        bounds: WeightBounds,
        version: u64,
    ) -> Result<Self> {
        if models.is_empty() {
            return Err(VigiaError::InvalidWeightConfig(
                "at least one model is required".to_string(),
            ));
        }
        if models.len() != weights.len() {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "{} models but {} weights",
                models.len(),
                weights.len()
            )));
        }
        let mut seen = HashSet::with_capacity(models.len());
        if let Some(dup) = models.iter().find(|m| !seen.insert(**m)) {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "model '{dup}' listed more than once"
            )));
        }
        bounds.validate(models.len())?;

        let total: f64 = weights.iter().sum();
        if !total.is_finite() || (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "weights must sum to 1.0, got {total}"
            )));
        }
        if let Some((m, w)) = models
            .iter()
            .zip(&weights)
            .find(|(_, w)| !bounds.contains(**w))
        {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "weight {w} for '{m}' outside [{}, {}]",
                bounds.min_weight, bounds.max_weight
            )));
        }

        Ok(Self {
            models,
            weights,
            bounds,
            version,
        })
    }

    /// Produce the next snapshot from a raw weight vector.
    ///
    /// The vector is projected onto the bounded simplex first, so the result
    /// always satisfies the invariants. The model order is preserved.
    pub fn next(&self, raw: &[f64]) -> Result<Self> {
        if raw.len() != self.models.len() {
            return Err(VigiaError::InvalidWeightConfig(format!(
                "{} models but {} weights",
                self.models.len(),
                raw.len()
            )));
        }
        let projected = self.bounds.project(raw);
        Self::checked(
            self.models.clone(),
            projected,
            self.bounds,
            self.version + 1,
        )
    }

    /// Models in snapshot order.
    pub fn models(&self) -> &[ModelKind] {
        &self.models
    }

    /// Weights in snapshot order.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Configured floor and ceiling.
    pub const fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    /// Snapshot version; 0 for the initial weights.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Always false for a constructed snapshot.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Weight held by `model`, if it is part of the ensemble.
    pub fn weight_of(&self, model: ModelKind) -> Option<f64> {
        self.models
            .iter()
            .position(|m| *m == model)
            .map(|i| self.weights[i])
    }

    /// Iterate `(model, weight)` pairs in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = (ModelKind, f64)> + '_ {
        self.models.iter().copied().zip(self.weights.iter().copied())
    }
}
