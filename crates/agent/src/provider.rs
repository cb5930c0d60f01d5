//! Procfs-backed snapshot provider
//!
//! Reads the raw OS state the core samples from:
//! - `/proc/net/dev` for per-interface cumulative counters
//! - `/proc/net/tcp[6]` for established connections and listening ports
//! - `/proc/net/udp[6]` for bound UDP ports
//! - `/proc/self/{status,stat,fd}` for agent-process metrics
//!
//! The IPv6 tables and process metrics are best-effort; the IPv4 tables and
//! the interface counters are required, and failing to read them fails the
//! cycle with a `CollectionError`.

use async_trait::async_trait;
use sentinel_lib::{
    CollectionError, ConnectionEntry, CustomMetricsSource, InterfaceCounters, ListeningPort,
    MetricValue, ProcessMetrics, Protocol, Snapshot, SnapshotProvider,
};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Kernel clock ticks per second, for /proc/self/stat time fields.
/// Falls back to the common default when sysconf cannot answer.
fn clock_ticks_per_sec() -> f64 {
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as f64
    } else {
        100.0
    }
}

/// TCP socket states from the kernel's socket tables.
const TCP_ESTABLISHED: u8 = 0x01;
const TCP_LISTEN: u8 = 0x0A;

/// Snapshot provider reading from a procfs mount.
pub struct ProcfsProvider {
    proc_root: PathBuf,
}

impl ProcfsProvider {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Create a provider over a custom proc path (for testing).
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Parse /proc/net/dev contents into per-interface counters.
    /// Loopback is skipped; it never reaches the backend.
    pub fn parse_net_dev(content: &str) -> BTreeMap<String, InterfaceCounters> {
        let mut interfaces = BTreeMap::new();

        for line in content.lines() {
            let line = line.trim();
            let Some((name, rest)) = line.split_once(':') else {
                continue; // header lines
            };
            let name = name.trim();
            if name == "lo" {
                continue;
            }

            let values: Vec<u64> = rest
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            if values.len() < 16 {
                continue;
            }

            interfaces.insert(
                name.to_string(),
                InterfaceCounters {
                    bytes_in: values[0],
                    packets_in: values[1],
                    bytes_out: values[8],
                    packets_out: values[9],
                },
            );
        }

        interfaces
    }

    /// Parse a /proc/net/{tcp,tcp6,udp,udp6} table.
    pub fn parse_socket_table(content: &str) -> Vec<SocketEntry> {
        content
            .lines()
            .skip(1)
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 4 {
                    return None;
                }
                let (local_addr, local_port) = parse_hex_endpoint(fields[1])?;
                let (remote_addr, remote_port) = parse_hex_endpoint(fields[2])?;
                let state = u8::from_str_radix(fields[3], 16).ok()?;
                Some(SocketEntry {
                    local_addr,
                    local_port,
                    remote_addr,
                    remote_port,
                    state,
                })
            })
            .collect()
    }

    /// VmRSS in bytes from /proc/self/status.
    pub fn parse_vm_rss(content: &str) -> Option<u64> {
        let line = content.lines().find(|l| l.starts_with("VmRSS:"))?;
        let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
        Some(kb * 1024)
    }

    /// (utime, stime, starttime) in clock ticks from /proc/self/stat.
    pub fn parse_stat_times(content: &str) -> Option<(u64, u64, u64)> {
        // comm can contain spaces; fields resume after the closing paren
        let (_, rest) = content.rsplit_once(')')?;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // rest starts at field 3 (state); utime is field 14, stime 15, starttime 22
        let utime = fields.get(11)?.parse().ok()?;
        let stime = fields.get(12)?.parse().ok()?;
        let starttime = fields.get(19)?.parse().ok()?;
        Some((utime, stime, starttime))
    }

    async fn read_required(&self, rel: &str) -> Result<String, CollectionError> {
        fs::read_to_string(self.proc_root.join(rel))
            .await
            .map_err(|e| {
                CollectionError::Unavailable(format!("{}: {e}", self.proc_root.join(rel).display()))
            })
    }

    async fn read_optional(&self, rel: &str) -> String {
        fs::read_to_string(self.proc_root.join(rel))
            .await
            .unwrap_or_default()
    }

    async fn process_metrics(&self) -> Option<ProcessMetrics> {
        let status = self.read_optional("self/status").await;
        let memory_bytes = Self::parse_vm_rss(&status)?;

        let stat = self.read_optional("self/stat").await;
        let (utime, stime, starttime) = Self::parse_stat_times(&stat)?;

        let uptime_content = self.read_optional("uptime").await;
        let uptime: f64 = uptime_content.split_whitespace().next()?.parse().ok()?;

        let clk_tck = clock_ticks_per_sec();
        let elapsed = uptime - starttime as f64 / clk_tck;
        let cpu_percent = if elapsed > 0.0 {
            ((utime + stime) as f64 / clk_tck) / elapsed * 100.0
        } else {
            0.0
        };

        let file_descriptor_count = count_dir_entries(&self.proc_root.join("self/fd")).await?;

        Some(ProcessMetrics {
            cpu_percent,
            memory_bytes,
            file_descriptor_count,
        })
    }
}

impl Default for ProcfsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotProvider for ProcfsProvider {
    async fn capture(&self) -> Result<Snapshot, CollectionError> {
        let net_dev = self.read_required("net/dev").await?;
        let network_interfaces = Self::parse_net_dev(&net_dev);

        let mut tcp = Self::parse_socket_table(&self.read_required("net/tcp").await?);
        tcp.extend(Self::parse_socket_table(&self.read_optional("net/tcp6").await));

        let mut udp = Self::parse_socket_table(&self.read_required("net/udp").await?);
        udp.extend(Self::parse_socket_table(&self.read_optional("net/udp6").await));

        let mut established_connections = Vec::new();
        let mut listening_ports = Vec::new();

        for entry in &tcp {
            match entry.state {
                TCP_ESTABLISHED => established_connections.push(ConnectionEntry {
                    local_addr: entry.local_addr.clone(),
                    local_port: entry.local_port,
                    remote_addr: entry.remote_addr.clone(),
                    remote_port: entry.remote_port,
                    protocol: Protocol::Tcp,
                }),
                TCP_LISTEN => listening_ports.push(ListeningPort {
                    protocol: Protocol::Tcp,
                    port: entry.local_port,
                    interface: entry.local_addr.clone(),
                }),
                _ => {}
            }
        }

        // UDP has no LISTEN state; any bound, unconnected socket counts.
        for entry in &udp {
            if entry.remote_port == 0 {
                listening_ports.push(ListeningPort {
                    protocol: Protocol::Udp,
                    port: entry.local_port,
                    interface: entry.local_addr.clone(),
                });
            }
        }

        let process_metrics = self.process_metrics().await;
        if process_metrics.is_none() {
            debug!("agent process metrics unavailable");
        }

        Ok(Snapshot {
            timestamp: chrono::Utc::now().timestamp(),
            network_interfaces,
            established_connections,
            listening_ports,
            process_metrics,
        })
    }
}

/// One row of a kernel socket table.
#[derive(Debug, Clone)]
pub struct SocketEntry {
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub state: u8,
}

/// Decode a `hex_addr:hex_port` endpoint from a socket table.
///
/// Addresses are stored as little-endian 32-bit groups, 8 hex chars for IPv4
/// and 32 for IPv6.
fn parse_hex_endpoint(s: &str) -> Option<(String, u16)> {
    let (addr_hex, port_hex) = s.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;

    let addr = match addr_hex.len() {
        8 => {
            let raw = u32::from_str_radix(addr_hex, 16).ok()?;
            Ipv4Addr::from(raw.to_le_bytes()).to_string()
        }
        32 => {
            let mut bytes = [0u8; 16];
            for (i, chunk) in bytes.chunks_exact_mut(4).enumerate() {
                let group = u32::from_str_radix(&addr_hex[i * 8..i * 8 + 8], 16).ok()?;
                chunk.copy_from_slice(&group.to_le_bytes());
            }
            Ipv6Addr::from(bytes).to_string()
        }
        _ => return None,
    };

    Some((addr, port))
}

async fn count_dir_entries(path: &Path) -> Option<u64> {
    let mut entries = fs::read_dir(path).await.ok()?;
    let mut count = 0u64;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    Some(count)
}

/// Custom-metrics source reporting the agent process's own resource usage,
/// enabled with `--custom-metrics`.
pub struct ProcessMetricsSource {
    provider: ProcfsProvider,
}

impl ProcessMetricsSource {
    pub fn new() -> Self {
        Self {
            provider: ProcfsProvider::new(),
        }
    }

    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            provider: ProcfsProvider::with_proc_root(proc_root),
        }
    }
}

impl Default for ProcessMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CustomMetricsSource for ProcessMetricsSource {
    async fn collect(&self) -> Result<BTreeMap<String, MetricValue>, CollectionError> {
        let metrics = self.provider.process_metrics().await.ok_or_else(|| {
            CollectionError::Unavailable("process metrics unreadable".to_string())
        })?;

        let mut values = BTreeMap::new();
        values.insert(
            "cpu_percent".to_string(),
            MetricValue::Float(metrics.cpu_percent),
        );
        values.insert(
            "memory_bytes".to_string(),
            MetricValue::Integer(metrics.memory_bytes as i64),
        );
        values.insert(
            "file_descriptor_count".to_string(),
            MetricValue::Integer(metrics.file_descriptor_count as i64),
        );
        Ok(values)
    }
}
