//! Risk command implementation.

use super::{banner, print_json, section};
use crate::{OutputFormat, data};
use anyhow::{Result, bail};
use std::path::Path;
use vigia::VigiaConfig;
use vigia_risk::{RiskAggregator, RiskCategoryScore, RiskInputBundle, RiskReport, assess_risk};

/// Build a risk report from raw inputs or precomputed scores.
pub(crate) fn run(
    config: &VigiaConfig,
    inputs: Option<&Path>,
    scores: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let report = match (inputs, scores) {
        (Some(path), _) => {
            let bundle: RiskInputBundle = data::read_json(path)?;
            assess_risk(&bundle, &config.risk)?
        }
        (None, Some(path)) => {
            let scores: Vec<RiskCategoryScore> = data::read_json(path)?;
            RiskAggregator::new(config.risk.clone())?.aggregate(&scores)?
        }
        (None, None) => bail!("either --inputs or --scores is required"),
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            banner("Risk Report");
            print_report(&report);
            Ok(())
        }
    }
}

/// Text rendering shared with `analyze`.
pub(crate) fn print_report(report: &RiskReport) {
    println!(
        "Overall:     {:.4} ({})",
        report.overall_score, report.overall_severity
    );
    println!("Weighted:    {:.4}", report.weighted_score);
    println!("Correlation: +{:.2}%", report.correlation_adjustment * 100.0);
    println!();

    section("BY CATEGORY");
    println!(
        "{:<12} {:>8} {:>8} {:>13} {:>10} {:>13}",
        "Category", "Score", "Weight", "Contribution", "Severity", "Timeframe"
    );
    println!("{}", "-".repeat(69));
    for row in &report.by_category {
        println!(
            "{:<12} {:>8.4} {:>8.2} {:>13.4} {:>10} {:>13}",
            row.category.to_string(),
            row.score,
            row.weight,
            row.contribution,
            row.severity.to_string(),
            row.timeframe.to_string()
        );
    }
    println!();

    section("BY TIMEFRAME");
    for (timeframe, contribution) in &report.by_timeframe {
        println!("{:<13} {contribution:>8.4}", timeframe.to_string());
    }
    println!();

    section("MITIGATIONS");
    if report.mitigations.is_empty() {
        println!("No mitigation rules fired.");
    }
    for m in &report.mitigations {
        println!(
            "[{}] {} on {} (effectiveness {:.2}, cost {:.2}, {})",
            m.priority, m.strategy, m.category, m.effectiveness, m.cost, m.timeframe
        );
        println!("    {}", m.description);
    }
    println!();
}
