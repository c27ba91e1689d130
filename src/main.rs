//! CLV Drift Monitor - Main Entry Point
//!
//! `train` fits a baseline model from raw transactions and publishes it as
//! the reference bundle; `monitor` runs one detection cycle against a
//! current snapshot and exits non-zero when the cycle fails.

use anyhow::Result;
use clap::{Parser, Subcommand};
use clv_drift_monitor::config::AppConfig;
use clv_drift_monitor::pipeline::MonitorPipeline;
use clv_drift_monitor::types::CycleState;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "clv-drift-monitor", about = "Drift monitoring for the CLV model")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a baseline model and publish it as the reference bundle
    Train {
        /// Raw transaction CSV to train from
        raw_csv: PathBuf,
    },
    /// Run one drift detection cycle against a current snapshot
    Monitor {
        /// Raw transaction CSV of the current period
        current_csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load_from_path(&cli.config)?
    } else {
        AppConfig::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("clv_drift_monitor={}", config.logging.level).parse()?),
        )
        .init();

    info!("Starting CLV Drift Monitor");

    let pipeline = MonitorPipeline::new(config).await;

    match cli.command {
        Command::Train { raw_csv } => {
            pipeline.train_reference(&raw_csv)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Monitor { current_csv } => {
            let report = pipeline.run_cycle(&current_csv).await?;
            if report.state == CycleState::CycleFailed {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
