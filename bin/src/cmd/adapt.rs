//! Adapt command implementation.

use super::{banner, print_json, section};
use crate::{OutputFormat, data};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use vigia::VigiaConfig;
use vigia_ensemble::{AdapterConfig, WeightAdapter};

/// Advance a weight snapshot by one adaptation step.
pub(crate) fn run(
    config: &VigiaConfig,
    records_path: &Path,
    weights_path: Option<&Path>,
    rate: Option<f64>,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let records = data::load_records(records_path)?;
    let current = data::load_weights(weights_path, &records, config.bounds)?;

    let adapter_config = AdapterConfig {
        adaptation_rate: rate.unwrap_or(config.adapter.adaptation_rate),
        ..config.adapter.clone()
    };
    let rate = adapter_config.adaptation_rate;
    let mut adapter = WeightAdapter::new(adapter_config)?;
    let next = adapter
        .update(&records, &current)
        .context("adapting weights")?;

    if let Some(path) = out {
        std::fs::write(path, serde_json::to_string_pretty(&next)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), version = next.version(), "wrote weight snapshot");
    }

    match format {
        OutputFormat::Json => print_json(&next),
        OutputFormat::Text => {
            banner("Weight Adaptation");
            println!("Rate:    {rate}");
            println!("Version: {} -> {}", current.version(), next.version());
            println!();

            section("ENSEMBLE WEIGHTS");
            println!(
                "{:<14} {:>10} {:>10} {:>10}",
                "Model", "Before", "After", "Change"
            );
            println!("{}", "-".repeat(47));
            for (model, after) in next.iter() {
                let before = current.weight_of(model).unwrap_or(0.0);
                println!(
                    "{:<14} {:>10.4} {:>10.4} {:>+10.4}",
                    model.to_string(),
                    before,
                    after,
                    after - before
                );
            }
            println!();
            println!(
                "Bounds: [{}, {}]",
                next.bounds().min_weight,
                next.bounds().max_weight
            );
            println!();
            Ok(())
        }
    }
}
