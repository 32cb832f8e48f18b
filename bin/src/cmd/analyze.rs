//! Analyze command implementation.

use super::{banner, combine::print_forecast, print_json, risk::print_report};
use crate::{OutputFormat, data};
use anyhow::Result;
use std::path::Path;
use vigia::VigiaConfig;
use vigia_risk::RiskInputBundle;

/// Run both pipelines concurrently and print the merged decision record.
pub(crate) async fn run(
    config: &VigiaConfig,
    records_path: &Path,
    weights_path: Option<&Path>,
    inputs_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let records = data::load_records(records_path)?;
    let weights = data::load_weights(weights_path, &records, config.bounds)?;
    let bundle: RiskInputBundle = data::read_json(inputs_path)?;

    let decision = vigia::analyze(records, weights, bundle, config).await?;

    match format {
        OutputFormat::Json => print_json(&decision),
        OutputFormat::Text => {
            banner("Forecast and Risk Analysis");
            println!("Generated: {}", decision.generated_at);
            if let Some(delta) = decision.expected_move() {
                println!("Expected move over horizon: {delta:+.4}");
            }
            println!();
            print_forecast(&decision.forecast);
            print_report(&decision.risk);
            Ok(())
        }
    }
}
