//! Sentinel Agent - device telemetry agent
//!
//! Long-running process that samples host and network state on an interval,
//! computes deltas against the previous sample, and publishes structured
//! metrics reports for a security-monitoring backend.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod provider;
mod run;
mod transport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let config = config::AgentConfig::parse();

    info!("Starting sentinel-agent");
    info!(
        device_id = %config.device_id,
        interval_secs = config.interval_secs,
        format = %config.format,
        naming_mode = %config.naming_mode(),
        custom_metrics = config.custom_metrics,
        dry_run = config.dry_run,
        "Agent configured"
    );

    run::run(config).await
}
