//! Service Mesh Analyzer CLI
//!
//! Learns per-service baselines from mesh telemetry and reports traffic,
//! error, latency and behavioral anomalies.

mod commands;
mod config;
mod output;
mod source;

use analyzer_lib::monitor::PipelineMode;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{learn, monitor, scan, status};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Service Mesh Analyzer CLI
#[derive(Parser)]
#[command(name = "smanalyzer")]
#[command(author, version, about = "Service Mesh Analyzer: anomaly detection for mesh traffic", long_about = None)]
pub struct Cli {
    /// Config file (default is $HOME/.smanalyzer.yaml)
    #[arg(long, global = true, env = "SMANALYZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "text")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a file of readings for anomalies
    Scan {
        /// NDJSON file of metric readings
        #[arg(long, short)]
        input: PathBuf,

        /// Only scan this entity
        #[arg(long, short)]
        entity: Option<String>,

        /// Learning mode: establish baselines instead of detecting
        #[arg(long, short)]
        learn: bool,

        /// Baseline snapshot to load (or to write with --learn)
        #[arg(long, short)]
        baselines: Option<PathBuf>,
    },

    /// Learn baseline behavior from a file of readings
    Learn {
        /// NDJSON file of metric readings
        #[arg(long, short)]
        input: PathBuf,

        /// Save learned baselines to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Continuously monitor a growing readings file
    Monitor {
        /// NDJSON file to tail
        #[arg(long, short)]
        input: PathBuf,

        /// Seconds between cycles
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,

        /// Path to a learned baseline model
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Learn baselines instead of detecting
        #[arg(long, value_enum, default_value = "detect")]
        mode: ModeArg,

        /// Stop after this many cycles
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Print Prometheus metrics to stderr on exit
        #[arg(long)]
        dump_metrics: bool,
    },

    /// Show configuration, input and baseline status
    Status {
        /// NDJSON file to summarize
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Baseline snapshot to summarize
        #[arg(long, short)]
        baselines: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Learn,
    Detect,
}

impl From<ModeArg> for PipelineMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Learn => PipelineMode::Learn,
            ModeArg::Detect => PipelineMode::Detect,
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            input,
            entity,
            learn,
            baselines,
        } => {
            let options = scan::ScanOptions {
                input: &input,
                entity: entity.as_deref(),
                learn,
                baselines: baselines.as_deref(),
            };
            scan::scan(&config, options, cli.format).await?;
        }
        Commands::Learn { input, output } => {
            learn::learn_baselines(&config, &input, output.as_deref(), cli.format).await?;
        }
        Commands::Monitor {
            input,
            interval_secs,
            model,
            mode,
            max_cycles,
            dump_metrics,
        } => {
            let options = monitor::MonitorOptions {
                input: &input,
                interval: Duration::from_secs(interval_secs.max(1)),
                mode: mode.into(),
                model: model.as_deref(),
                max_cycles,
                dump_metrics,
            };
            monitor::monitor(&config, options, cli.format).await?;
        }
        Commands::Status { input, baselines } => {
            status::show_status(
                &config,
                cli.config.as_deref(),
                input.as_deref(),
                baselines.as_deref(),
                cli.format,
            )
            .await?;
        }
    }

    Ok(())
}
