//! Concurrent forecast and risk analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use vigia_ensemble::CombinedForecast;
use vigia_risk::{RiskInputBundle, RiskReport, Severity, assess_risk};
use vigia_traits::{EnsembleWeights, ForecastRecord, Result, VigiaError};

use crate::config::VigiaConfig;

/// Merged output of one analysis cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// When the record was produced
    pub generated_at: DateTime<Utc>,
    /// Combined forecast
    pub forecast: CombinedForecast,
    /// Risk report
    pub risk: RiskReport,
}

impl DecisionRecord {
    /// Whether the overall risk reached at least `severity`.
    #[must_use]
    pub fn risk_at_least(&self, severity: Severity) -> bool {
        self.risk.overall_severity >= severity
    }

    /// Expected change from the first to the last combined step.
    #[must_use]
    pub fn expected_move(&self) -> Option<f64> {
        let values = &self.forecast.values;
        Some(values.last()? - values.first()?)
    }
}

/// Run the forecast and risk pipelines concurrently and merge them.
///
/// Both pipelines are CPU-bound, so each runs on the blocking pool. The two
/// are independent; either failing fails the analysis.
///
/// # Examples
///
/// ```rust,no_run
/// use vigia::{VigiaConfig, analyze};
/// # fn inputs() -> (Vec<vigia::traits::ForecastRecord>, vigia::traits::EnsembleWeights, vigia::risk::RiskInputBundle) { unimplemented!() }
///
/// # async fn run() -> vigia::Result<()> {
/// let (records, weights, bundle) = inputs();
/// let decision = analyze(records, weights, bundle, &VigiaConfig::default()).await?;
/// println!("{:?} / {}", decision.expected_move(), decision.risk.overall_severity);
/// # Ok(())
/// # }
/// ```
pub async fn analyze(
    records: Vec<ForecastRecord>,
    weights: EnsembleWeights,
    bundle: RiskInputBundle,
    config: &VigiaConfig,
) -> Result<DecisionRecord> {
    config.validate()?;
    let combiner = config.build_combiner()?;
    let risk_config = config.risk.clone();

    let forecast_task =
        tokio::task::spawn_blocking(move || combiner.combine(&records, &weights));
    let risk_task = tokio::task::spawn_blocking(move || assess_risk(&bundle, &risk_config));

    let (forecast, risk) = tokio::join!(forecast_task, risk_task);
    let forecast = forecast.map_err(|e| VigiaError::Other(format!("forecast task failed: {e}")))??;
    let risk = risk.map_err(|e| VigiaError::Other(format!("risk task failed: {e}")))??;

    info!(
        overall_risk = risk.overall_score,
        severity = %risk.overall_severity,
        uncertainty = forecast.uncertainty,
        "analysis complete"
    );

    Ok(DecisionRecord {
        generated_at: Utc::now(),
        forecast,
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bundle, three_records};
    use approx::assert_relative_eq;
    use vigia_traits::{ModelKind, WeightBounds};

    fn weights() -> EnsembleWeights {
        EnsembleWeights::equal(
            vec![ModelKind::Arima, ModelKind::Prophet, ModelKind::Lstm],
            WeightBounds::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_merges_both_pipelines() {
        let decision = analyze(three_records(), weights(), bundle(), &VigiaConfig::default())
            .await
            .unwrap();
        assert_relative_eq!(decision.forecast.values[3], 102.0, epsilon = 1e-9);
        assert_relative_eq!(decision.risk.overall_score, 0.37275, epsilon = 1e-9);
        assert!(decision.risk_at_least(Severity::Medium));
        assert!(!decision.risk_at_least(Severity::High));
        assert_relative_eq!(decision.expected_move().unwrap(), 2.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_analyze_propagates_risk_error() {
        let mut bad = bundle();
        bad.market.var_fraction = -0.2;
        let err = analyze(three_records(), weights(), bad, &VigiaConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VigiaError::OutOfRangeMetric { .. }));
    }
}
