mod analyze;
mod check;
mod render;
mod run;
mod stages;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::render::ReportFormat;
use crate::run::RunOptions;

#[derive(Debug, Parser)]
#[command(name = "sigscope")]
#[command(about = "Collect user signals and report on sentiment, themes and patterns")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline over a signals file and write a report
    Run {
        /// JSON file holding an array of signals
        #[arg(long)]
        signals: PathBuf,

        /// Report format
        #[arg(long, value_enum, default_value = "markdown")]
        format: ReportFormat,

        /// Report path (defaults to a timestamped file in the output dir)
        #[arg(long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Print the report instead of writing a file
        #[arg(long)]
        stdout: bool,

        /// Skip LLM theme extraction
        #[arg(long)]
        skip_themes: bool,
    },
    /// Detect workflow, comparison, frustration and request phrases
    Patterns {
        /// JSON file holding an array of signals
        #[arg(long)]
        signals: PathBuf,

        /// Minimum occurrences for a pattern to be listed
        #[arg(long)]
        min_frequency: Option<usize>,
    },
    /// Group keywords by edit-distance similarity
    Cluster {
        /// Keywords to cluster
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Minimum similarity for a keyword to join a cluster, in [0, 1]
        #[arg(long, value_parser = parse_unit_interval)]
        threshold: Option<f64>,

        /// Fold the smallest clusters into "other" beyond this many
        #[arg(long)]
        max_clusters: Option<usize>,
    },
    /// Print the effective configuration and validate input files
    CheckConfig {
        /// Also check that this signals file loads
        #[arg(long)]
        signals: Option<PathBuf>,
    },
}

fn parse_unit_interval(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in [0, 1]"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = sigscope_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            signals,
            format,
            output,
            stdout,
            skip_themes,
        } => {
            run::run_pipeline(
                &config,
                RunOptions {
                    signals,
                    format,
                    output,
                    stdout,
                    skip_themes,
                },
            )
            .await?;
        }
        Commands::Patterns {
            signals,
            min_frequency,
        } => analyze::run_patterns(&config, &signals, min_frequency).await?,
        Commands::Cluster {
            keywords,
            threshold,
            max_clusters,
        } => analyze::run_cluster(&config, &keywords, threshold, max_clusters),
        Commands::CheckConfig { signals } => {
            check::run_check_config(&config, signals.as_deref()).await?;
        }
    }

    Ok(())
}
