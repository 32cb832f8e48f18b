//! Majority-direction combination strategy.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use vigia_traits::{ForecastRecord, Result, VigiaError};

use crate::combiner::{Combiner, check_inputs, value_matrix};

/// Local direction of one model's forecast between consecutive steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Change smaller than the sideways epsilon
    #[display("sideways")]
    Sideways,
    /// Rising forecast
    #[display("up")]
    Up,
    /// Falling forecast
    #[display("down")]
    Down,
}

impl Direction {
    /// Tie-break order when votes and weights are exactly equal.
    const PRECEDENCE: [Self; 3] = [Self::Sideways, Self::Up, Self::Down];

    /// Classify a step change.
    #[must_use]
    pub fn classify(delta: f64, epsilon: f64) -> Self {
        if delta.abs() < epsilon {
            Self::Sideways
        } else if delta > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Sideways => 0,
            Self::Up => 1,
            Self::Down => 2,
        }
    }
}

/// Configuration for majority-direction combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MajorityConfig {
    /// Absolute step change below which a model counts as moving sideways
    pub sideways_epsilon: f64,
}

impl Default for MajorityConfig {
    fn default() -> Self {
        Self {
            sideways_epsilon: 1e-6,
        }
    }
}

impl MajorityConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.sideways_epsilon.is_finite() && self.sideways_epsilon >= 0.0) {
            return Err(VigiaError::Validation(format!(
                "sideways_epsilon must be non-negative, got {}",
                self.sideways_epsilon
            )));
        }
        Ok(())
    }
}

/// Majority-direction combiner.
///
/// At each step every model votes up, down or sideways based on its own
/// change from the previous step. The direction with the most votes wins;
/// ties go to the direction with the larger total weight, then to the order
/// sideways, up, down. The combined value is the plain mean of the models
/// that voted for the winner. A model's direction is measured against its
/// last finite value before `t`; with no earlier value it votes sideways.
/// A model with a missing value at `t` abstains.
#[derive(Debug, Clone, Default)]
pub struct MajorityDirectionCombiner {
    config: MajorityConfig,
}

impl MajorityDirectionCombiner {
    /// Create a new majority-direction combiner.
    pub const fn new(config: MajorityConfig) -> Self {
        Self { config }
    }

    /// Winning direction from per-direction vote counts and weights.
    fn winner(votes: &[usize; 3], weight: &[f64; 3]) -> Option<Direction> {
        Direction::PRECEDENCE
            .into_iter()
            .filter(|d| votes[d.index()] > 0)
            .reduce(|best, d| {
                let (vb, vd) = (votes[best.index()], votes[d.index()]);
                if vd > vb || (vd == vb && weight[d.index()] > weight[best.index()]) {
                    d
                } else {
                    best
                }
            })
    }
}

impl Combiner for MajorityDirectionCombiner {
    fn combine(&self, records: &[ForecastRecord], weights: &[f64]) -> Result<Array1<f64>> {
        let horizon = check_inputs(records, weights)?;
        let matrix = value_matrix(records, horizon);
        let epsilon = self.config.sideways_epsilon;

        let mut combined = Array1::zeros(horizon);
        // last finite value of each model before the current step
        let mut last: Vec<Option<f64>> = vec![None; records.len()];
        for t in 0..horizon {
            let mut ballots: Vec<(Direction, f64)> = Vec::with_capacity(records.len());
            let mut votes = [0usize; 3];
            let mut weight = [0.0f64; 3];

            for (i, &w) in weights.iter().enumerate() {
                let current = matrix[[i, t]];
                if !current.is_finite() {
                    continue;
                }
                let direction = last[i].map_or(Direction::Sideways, |previous| {
                    Direction::classify(current - previous, epsilon)
                });
                last[i] = Some(current);
                votes[direction.index()] += 1;
                weight[direction.index()] += w;
                ballots.push((direction, current));
            }

            let winner = Self::winner(&votes, &weight).ok_or_else(|| {
                VigiaError::InsufficientData(format!("no model forecast step {t}"))
            })?;
            let (sum, n) = ballots
                .iter()
                .filter(|(d, _)| *d == winner)
                .fold((0.0, 0usize), |(s, n), (_, v)| (s + v, n + 1));
            combined[t] = sum / n as f64;
        }

        Ok(combined)
    }

    fn name(&self) -> &str {
        "majority_direction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use approx::assert_relative_eq;
    use vigia_traits::ModelKind;

    #[test]
    fn test_classify() {
        assert_eq!(Direction::classify(0.5, 0.1), Direction::Up);
        assert_eq!(Direction::classify(-0.5, 0.1), Direction::Down);
        assert_eq!(Direction::classify(0.05, 0.1), Direction::Sideways);
    }

    #[test]
    fn test_majority_follows_most_votes() {
        let records = vec![
            record(ModelKind::Arima, &[100.0, 101.0, 102.0, 103.0]),
            record(ModelKind::Prophet, &[100.0, 99.0, 98.0, 97.0]),
            record(ModelKind::Lstm, &[100.0, 102.0, 104.0, 106.0]),
        ];
        let third = 1.0 / 3.0;
        let result = MajorityDirectionCombiner::default()
            .combine(&records, &[third, third, third])
            .unwrap();

        // first step: everyone sideways -> mean of all
        assert_relative_eq!(result[0], 100.0);
        // up wins 2-1: mean of arima and lstm
        assert_relative_eq!(result[1], 101.5);
        assert_relative_eq!(result[2], 103.0);
        assert_relative_eq!(result[3], 104.5);
    }

    #[test]
    fn test_majority_tie_broken_by_weight() {
        let records = vec![
            record(ModelKind::Arima, &[10.0, 11.0]),
            record(ModelKind::Prophet, &[10.0, 8.0]),
        ];
        let up_heavy = MajorityDirectionCombiner::default()
            .combine(&records, &[0.7, 0.3])
            .unwrap();
        assert_relative_eq!(up_heavy[1], 11.0);

        let down_heavy = MajorityDirectionCombiner::default()
            .combine(&records, &[0.3, 0.7])
            .unwrap();
        assert_relative_eq!(down_heavy[1], 8.0);
    }

    #[test]
    fn test_majority_exact_tie_prefers_sideways_then_up() {
        let records = vec![
            record(ModelKind::Arima, &[10.0, 11.0]),
            record(ModelKind::Prophet, &[10.0, 10.0]),
        ];
        let result = MajorityDirectionCombiner::default()
            .combine(&records, &[0.5, 0.5])
            .unwrap();
        assert_relative_eq!(result[1], 10.0);

        let records = vec![
            record(ModelKind::Arima, &[10.0, 11.0]),
            record(ModelKind::Prophet, &[10.0, 9.0]),
        ];
        let result = MajorityDirectionCombiner::default()
            .combine(&records, &[0.5, 0.5])
            .unwrap();
        assert_relative_eq!(result[1], 11.0);
    }

    #[test]
    fn test_majority_epsilon_sideways() {
        let config = MajorityConfig {
            sideways_epsilon: 0.5,
        };
        let records = vec![
            record(ModelKind::Arima, &[10.0, 10.2]),
            record(ModelKind::Prophet, &[10.0, 9.9]),
            record(ModelKind::Lstm, &[10.0, 12.0]),
        ];
        let result = MajorityDirectionCombiner::new(config)
            .combine(&records, &[0.2, 0.2, 0.6])
            .unwrap();
        // two sideways votes beat one heavy up vote
        assert_relative_eq!(result[1], (10.2 + 9.9) / 2.0);
    }

    #[test]
    fn test_majority_without_history_votes_sideways() {
        let records = vec![
            record(ModelKind::Arima, &[f64::NAN, 12.0]),
            record(ModelKind::Prophet, &[10.0, 9.0]),
        ];
        let result = MajorityDirectionCombiner::default()
            .combine(&records, &[0.5, 0.5])
            .unwrap();
        assert_relative_eq!(result[0], 10.0);
        // sideways (arima) ties down (prophet) and wins on precedence
        assert_relative_eq!(result[1], 12.0);
    }

    #[test]
    fn test_majority_staggered_gaps() {
        let records = vec![
            record(ModelKind::Arima, &[1.0, f64::NAN, 3.0]),
            record(ModelKind::Prophet, &[1.0, 2.0, f64::NAN]),
        ];
        let result = MajorityDirectionCombiner::default()
            .combine(&records, &[0.5, 0.5])
            .unwrap();
        assert_relative_eq!(result[0], 1.0);
        assert_relative_eq!(result[1], 2.0);
        // arima compares against its value at step 0
        assert_relative_eq!(result[2], 3.0);
    }

    #[test]
    fn test_majority_step_without_values() {
        let records = vec![
            record(ModelKind::Arima, &[1.0, f64::NAN]),
            record(ModelKind::Prophet, &[1.0, f64::NAN]),
        ];
        let result = MajorityDirectionCombiner::default().combine(&records, &[0.5, 0.5]);
        assert!(matches!(result, Err(VigiaError::InsufficientData(_))));
    }

    #[test]
    fn test_majority_config_validation() {
        let config = MajorityConfig {
            sideways_epsilon: -1.0,
        };
        assert!(config.validate().is_err());
    }
}
