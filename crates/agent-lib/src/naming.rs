//! Wire field naming
//!
//! The backend accepts two key vocabularies for the same report schema: long
//! names (`bytes_in`) and short tags (`bi`) that keep constrained-device
//! payloads small. The mode is fixed for the lifetime of an agent run; the
//! serializer takes one mode per report, so mixed-mode reports cannot be
//! expressed.

use std::fmt;
use std::str::FromStr;

/// Which vocabulary to emit on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    Short,
    Long,
}

impl FromStr for NamingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(NamingMode::Short),
            "long" => Ok(NamingMode::Long),
            other => Err(format!("unknown naming mode: {other} (expected short|long)")),
        }
    }
}

impl fmt::Display for NamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingMode::Short => f.write_str("short"),
            NamingMode::Long => f.write_str("long"),
        }
    }
}

/// Closed set of logical wire keys.
///
/// Requesting a key outside this set is a compile error rather than a runtime
/// one, so malformed field names cannot be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Header,
    ReportId,
    Version,
    Metrics,
    ListeningPorts,
    EstablishedConnections,
    NetworkStats,
    Protocol,
    Port,
    Interface,
    LocalAddr,
    LocalPort,
    RemoteAddr,
    RemotePort,
    BytesIn,
    BytesOut,
    PacketsIn,
    PacketsOut,
    CustomMetrics,
}

impl Field {
    const ALL: [Field; 19] = [
        Field::Header,
        Field::ReportId,
        Field::Version,
        Field::Metrics,
        Field::ListeningPorts,
        Field::EstablishedConnections,
        Field::NetworkStats,
        Field::Protocol,
        Field::Port,
        Field::Interface,
        Field::LocalAddr,
        Field::LocalPort,
        Field::RemoteAddr,
        Field::RemotePort,
        Field::BytesIn,
        Field::BytesOut,
        Field::PacketsIn,
        Field::PacketsOut,
        Field::CustomMetrics,
    ];

    /// Wire key for this field under the given mode.
    pub const fn wire(self, mode: NamingMode) -> &'static str {
        match mode {
            NamingMode::Long => self.long(),
            NamingMode::Short => self.short(),
        }
    }

    const fn long(self) -> &'static str {
        match self {
            Field::Header => "header",
            Field::ReportId => "report_id",
            Field::Version => "version",
            Field::Metrics => "metrics",
            Field::ListeningPorts => "listening_ports",
            Field::EstablishedConnections => "established_connections",
            Field::NetworkStats => "network_stats",
            Field::Protocol => "protocol",
            Field::Port => "port",
            Field::Interface => "interface",
            Field::LocalAddr => "local_addr",
            Field::LocalPort => "local_port",
            Field::RemoteAddr => "remote_addr",
            Field::RemotePort => "remote_port",
            Field::BytesIn => "bytes_in",
            Field::BytesOut => "bytes_out",
            Field::PacketsIn => "packets_in",
            Field::PacketsOut => "packets_out",
            Field::CustomMetrics => "custom_metrics",
        }
    }

    const fn short(self) -> &'static str {
        match self {
            Field::Header => "hed",
            Field::ReportId => "rid",
            Field::Version => "v",
            Field::Metrics => "met",
            Field::ListeningPorts => "pts",
            Field::EstablishedConnections => "ec",
            Field::NetworkStats => "ns",
            Field::Protocol => "pr",
            Field::Port => "pt",
            Field::Interface => "if",
            Field::LocalAddr => "lad",
            Field::LocalPort => "lp",
            Field::RemoteAddr => "rad",
            Field::RemotePort => "rp",
            Field::BytesIn => "bi",
            Field::BytesOut => "bo",
            Field::PacketsIn => "pi",
            Field::PacketsOut => "po",
            Field::CustomMetrics => "cmet",
        }
    }

    /// Reverse lookup for decoding, under the matching mode.
    pub fn from_wire(key: &str, mode: NamingMode) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.wire(mode) == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_match_logical_names() {
        assert_eq!(Field::BytesIn.wire(NamingMode::Long), "bytes_in");
        assert_eq!(Field::Header.wire(NamingMode::Long), "header");
        assert_eq!(
            Field::EstablishedConnections.wire(NamingMode::Long),
            "established_connections"
        );
    }

    #[test]
    fn short_tags_are_compact() {
        assert_eq!(Field::BytesIn.wire(NamingMode::Short), "bi");
        assert_eq!(Field::Header.wire(NamingMode::Short), "hed");
        assert_eq!(Field::CustomMetrics.wire(NamingMode::Short), "cmet");
    }

    #[test]
    fn tables_are_bijective() {
        for mode in [NamingMode::Short, NamingMode::Long] {
            for field in Field::ALL {
                let key = field.wire(mode);
                assert_eq!(Field::from_wire(key, mode), Some(field), "key {key}");
            }
        }
    }

    #[test]
    fn short_tags_have_no_collisions() {
        let mut seen = std::collections::BTreeSet::new();
        for field in Field::ALL {
            assert!(seen.insert(field.wire(NamingMode::Short)));
        }
    }

    #[test]
    fn mode_parses_from_config_strings() {
        assert_eq!("short".parse::<NamingMode>().unwrap(), NamingMode::Short);
        assert_eq!("long".parse::<NamingMode>().unwrap(), NamingMode::Long);
        assert!("medium".parse::<NamingMode>().is_err());
    }
}
