//! Argus CLI
//!
//! Command-line interface for the observatory device monitoring service.

use std::path::PathBuf;

use argus::{load_config, Config};
use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "argus")]
#[command(about = "Observatory device monitoring service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Status API port (overrides config file)
    #[arg(long)]
    status_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(status_port) = args.status_port {
        config.service.status_port = status_port;
    }

    tracing::info!(
        "Starting argus with {} configured device(s)",
        config.devices.len()
    );

    argus::run(config).await?;

    Ok(())
}
