//! CLI subcommand modules.
//!
//! This module contains the implementations for all vigia CLI subcommands.

pub(crate) mod adapt;
pub(crate) mod analyze;
pub(crate) mod combine;
pub(crate) mod risk;

use anyhow::Result;
use serde::Serialize;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Print a boxed title, padded to the box width.
pub(crate) fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{title:^62}║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

/// Print a section heading between rules.
pub(crate) fn section(title: &str) {
    println!("{RULE}");
    println!("{title}");
    println!("{RULE}\n");
}

/// Pretty-print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
