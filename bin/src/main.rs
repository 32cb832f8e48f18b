//! vigia CLI binary.
//!
//! Combines forecast records, adapts ensemble weights and builds risk
//! reports from JSON files.

mod cmd;
mod data;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use vigia::VigiaConfig;
use vigia_ensemble::CombinationStrategy;

#[derive(Parser)]
#[command(name = "vigia")]
#[command(about = "Forecast ensemble combination and risk aggregation", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON); falls back to $VIGIA_CONFIG, then defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable tables
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Combination strategy as given on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Weighted average of the models present at each step
    Weighted,
    /// Mean of the models agreeing with the majority direction
    MajorityDirection,
    /// Configured meta-model over the base forecasts
    Stacking,
}

impl From<StrategyArg> for CombinationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Weighted => Self::Weighted,
            StrategyArg::MajorityDirection => Self::MajorityDirection,
            StrategyArg::Stacking => Self::Stacking,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Combine forecast records into one forecast
    Combine {
        /// Forecast records (JSON array)
        #[arg(short, long)]
        records: PathBuf,

        /// Weight snapshot (JSON); equal weights if omitted
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Override the configured strategy
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,
    },

    /// Compute the next weight snapshot from forecast accuracy
    Adapt {
        /// Forecast records (JSON array)
        #[arg(short, long)]
        records: PathBuf,

        /// Current weight snapshot (JSON); equal weights if omitted
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Override the configured adaptation rate
        #[arg(long)]
        rate: Option<f64>,

        /// Write the new snapshot to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Build a risk report
    Risk {
        /// Raw category inputs (JSON object with all five categories)
        #[arg(short, long, conflicts_with = "scores", required_unless_present = "scores")]
        inputs: Option<PathBuf>,

        /// Precomputed category scores (JSON array)
        #[arg(short, long)]
        scores: Option<PathBuf>,
    },

    /// Run forecast combination and risk assessment together
    Analyze {
        /// Forecast records (JSON array)
        #[arg(short, long)]
        records: PathBuf,

        /// Weight snapshot (JSON); equal weights if omitted
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Raw category inputs (JSON)
        #[arg(short, long)]
        inputs: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var_os("VIGIA_CONFIG").map(PathBuf::from));
    let config = VigiaConfig::load_or_default(config_path.as_deref())
        .context("loading configuration")?;
    let format = cli.format;

    match cli.command {
        Commands::Combine {
            records,
            weights,
            strategy,
        } => {
            cmd::combine::run(
                &config,
                &records,
                weights.as_deref(),
                strategy.map(Into::into),
                format,
            )?;
        }
        Commands::Adapt {
            records,
            weights,
            rate,
            out,
        } => {
            cmd::adapt::run(
                &config,
                &records,
                weights.as_deref(),
                rate,
                out.as_deref(),
                format,
            )?;
        }
        Commands::Risk { inputs, scores } => {
            cmd::risk::run(&config, inputs.as_deref(), scores.as_deref(), format)?;
        }
        Commands::Analyze {
            records,
            weights,
            inputs,
        } => {
            cmd::analyze::run(&config, &records, weights.as_deref(), &inputs, format).await?;
        }
    }

    Ok(())
}
