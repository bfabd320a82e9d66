//! Probe alerting CLI
//!
//! Reads probe results as JSON lines on stdin and runs the configured
//! notification commands when targets cross their alert thresholds.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use probe_alerting::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "probe-alerting")]
#[command(about = "Probe alerting and external command notifications")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resolve and log notification commands without running them
    #[arg(long)]
    dry_run: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries published alerts, keep logs on stderr.
    // Plain text when redirected so the alert audit lines stay greppable.
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, dry_run={}, log_level={:?}",
        args.config,
        args.dry_run,
        args.log_level
    );

    let config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    tracing::info!("Starting probe alerting for probe '{}'", config.probe_name);
    probe_alerting::run(config, args.dry_run).await?;

    Ok(())
}
