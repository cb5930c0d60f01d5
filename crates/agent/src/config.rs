//! Agent configuration
//!
//! All knobs come from the command line with environment fallbacks. The two
//! values the core consumes (naming mode, custom-metrics flag) are fixed for
//! the lifetime of the run.

use clap::{Parser, ValueEnum};
use sentinel_lib::NamingMode;
use std::fmt;
use std::path::PathBuf;

/// Serialization format for published reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WireFormat {
    Json,
    Cbor,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Json => f.write_str("json"),
            WireFormat::Cbor => f.write_str("cbor"),
        }
    }
}

/// Device telemetry agent: samples host and network state and publishes
/// delta-based metrics reports for a security-monitoring backend.
#[derive(Debug, Clone, Parser)]
#[command(name = "sentinel-agent", version)]
pub struct AgentConfig {
    /// Device identifier used in the metrics topic.
    #[arg(long, env = "SENTINEL_DEVICE_ID", default_value_t = default_device_id())]
    pub device_id: String,

    /// Seconds between metric samples.
    #[arg(short = 'i', long = "interval", env = "SENTINEL_INTERVAL_SECS", default_value_t = 300)]
    pub interval_secs: u64,

    /// Serialization format for published reports.
    #[arg(short = 'f', long, env = "SENTINEL_FORMAT", value_enum, default_value_t = WireFormat::Json)]
    pub format: WireFormat,

    /// Use short wire field names to shrink payloads.
    #[arg(short = 's', long = "short-names", env = "SENTINEL_SHORT_NAMES")]
    pub short_names: bool,

    /// Include agent-process metrics as custom metrics.
    #[arg(long = "custom-metrics", env = "SENTINEL_CUSTOM_METRICS")]
    pub custom_metrics: bool,

    /// Collect and print reports without publishing them.
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,

    /// Topic prefix the backend expects reports under.
    #[arg(long, env = "SENTINEL_TOPIC_PREFIX", default_value = "devices")]
    pub topic_prefix: String,

    /// Directory where serialized reports are spooled for the publisher.
    #[arg(long, env = "SENTINEL_SPOOL_DIR", default_value = "/var/spool/sentinel-agent")]
    pub spool_dir: PathBuf,
}

impl AgentConfig {
    pub fn naming_mode(&self) -> NamingMode {
        if self.short_names {
            NamingMode::Short
        } else {
            NamingMode::Long
        }
    }

    /// Metrics topic for this device and format.
    pub fn topic(&self) -> String {
        format!(
            "{}/{}/metrics/{}",
            self.topic_prefix, self.device_id, self.format
        )
    }
}

fn default_device_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-device".to_string())
}
