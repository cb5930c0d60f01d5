//! Core data model for snapshots and metrics reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Report schema version understood by the monitoring backend.
pub const REPORT_VERSION: &str = "1.0";

/// Transport protocol for a socket entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative traffic counters for one network interface.
///
/// Counters are monotonically non-decreasing while the interface is up, but
/// reset to zero when the interface restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
}

/// One established connection observed on the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub protocol: Protocol,
}

/// One port the host is accepting traffic on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListeningPort {
    pub protocol: Protocol,
    pub port: u16,
    pub interface: String,
}

/// Resource usage of the agent process itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub file_descriptor_count: u64,
}

/// Raw point-in-time view of host and network state.
///
/// Produced fresh each collection cycle by a [`SnapshotProvider`], consumed by
/// the delta engine, which retains it as the baseline for the next cycle.
///
/// [`SnapshotProvider`]: crate::collector::SnapshotProvider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sample time, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Cumulative counters keyed by interface name.
    pub network_interfaces: BTreeMap<String, InterfaceCounters>,
    pub established_connections: Vec<ConnectionEntry>,
    pub listening_ports: Vec<ListeningPort>,
    /// Agent-process resource usage, when the provider can read it.
    pub process_metrics: Option<ProcessMetrics>,
}

impl Snapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn empty() -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            network_interfaces: BTreeMap::new(),
            established_connections: Vec::new(),
            listening_ports: Vec::new(),
            process_metrics: None,
        }
    }
}

/// Value of a single custom metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Report header: identity and schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    /// Monotonic per-run counter, starting at 1. Skipped cycles still consume
    /// an id, so gaps in the sequence reveal failed cycles to the backend.
    pub report_id: u64,
    pub version: String,
}

/// The metric groups of one report.
///
/// Listening ports and established connections are always absolute sets.
/// `network_stats` holds deltas against the previous snapshot, except for the
/// baseline cycle and for interfaces with no history, which carry absolute
/// counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub listening_ports: Vec<ListeningPort>,
    pub established_connections: Vec<ConnectionEntry>,
    pub network_stats: BTreeMap<String, InterfaceCounters>,
}

/// Finished metrics report, immutable once assembled.
///
/// `custom_metrics` is `Some` only when the custom-metrics capability was
/// enabled and collected successfully this cycle; the field's presence itself
/// is the signal to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub header: ReportHeader,
    pub metrics: ReportMetrics,
    pub custom_metrics: Option<BTreeMap<String, MetricValue>>,
}
