//! Combine command implementation.

use super::{banner, print_json, section};
use crate::{OutputFormat, data};
use anyhow::{Context, Result};
use std::path::Path;
use vigia::VigiaConfig;
use vigia_ensemble::{CombinationStrategy, CombinedForecast, UncertaintyMethod};

/// Combine forecast records into one ensemble forecast.
pub(crate) fn run(
    config: &VigiaConfig,
    records_path: &Path,
    weights_path: Option<&Path>,
    strategy: Option<CombinationStrategy>,
    format: OutputFormat,
) -> Result<()> {
    let records = data::load_records(records_path)?;
    let weights = data::load_weights(weights_path, &records, config.bounds)?;

    let mut config = config.clone();
    if let Some(strategy) = strategy {
        config.combiner.strategy = strategy;
    }
    let forecast = config
        .build_combiner()?
        .combine(&records, &weights)
        .context("combining forecasts")?;

    match format {
        OutputFormat::Json => print_json(&forecast),
        OutputFormat::Text => {
            banner("Ensemble Forecast");
            print_forecast(&forecast);
            Ok(())
        }
    }
}

pub(crate) const fn method_name(method: &UncertaintyMethod) -> &'static str {
    match method {
        UncertaintyMethod::Variance => "variance",
        UncertaintyMethod::Bootstrap { .. } => "bootstrap",
        UncertaintyMethod::Conformal { .. } => "conformal",
    }
}

/// Text rendering shared with `analyze`.
pub(crate) fn print_forecast(forecast: &CombinedForecast) {
    println!("Strategy:    {}", forecast.strategy);
    println!(
        "Uncertainty: {:.4} ({})",
        forecast.uncertainty,
        method_name(&forecast.uncertainty_method)
    );
    println!("Diversity:   {:.4}", forecast.diversity.aggregate);
    println!("Weights:     v{}", forecast.weights.version());
    println!();

    section("COMBINED FORECAST");
    println!(
        "{:<26} {:>12} {:>12} {:>12}",
        "Timestamp", "Value", "Lower", "Upper"
    );
    println!("{}", "-".repeat(65));
    for ((ts, value), ci) in forecast
        .timestamps
        .iter()
        .zip(&forecast.values)
        .zip(&forecast.confidence_intervals)
    {
        println!(
            "{:<26} {:>12.4} {:>12.4} {:>12.4}",
            ts.to_string(),
            value,
            ci.lower,
            ci.upper
        );
    }
    println!();

    section("MODEL CONTRIBUTIONS");
    println!(
        "{:<14} {:>10} {:>12} {:>10} {:>13}",
        "Model", "Weight", "Performance", "Diversity", "Contribution"
    );
    println!("{}", "-".repeat(63));
    for c in &forecast.model_contributions {
        println!(
            "{:<14} {:>10.4} {:>12.4} {:>10.4} {:>13.4}",
            c.model_id.to_string(),
            c.weight,
            c.performance,
            c.diversity,
            c.contribution
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_name() {
        assert_eq!(method_name(&UncertaintyMethod::Variance), "variance");
        assert_eq!(
            method_name(&UncertaintyMethod::Conformal { alpha: 0.1 }),
            "conformal"
        );
    }
}
