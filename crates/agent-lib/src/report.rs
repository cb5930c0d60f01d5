//! Report assembly

use crate::models::{
    ConnectionEntry, InterfaceCounters, ListeningPort, MetricValue, Report, ReportHeader,
    ReportMetrics, REPORT_VERSION,
};
use std::collections::BTreeMap;

/// Assembles immutable reports and owns the report id counter.
///
/// Ids start at 1 and are handed out at the start of every cycle, before the
/// cycle can fail, so a skipped cycle still consumes an id and the backend can
/// spot gaps in the sequence.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    next_id: u64,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Reserve the report id for the cycle that is about to run.
    pub fn begin_cycle(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Build the report for one cycle. Pure assembly: sorts the sets into
    /// canonical order so serialization is reproducible, then freezes the
    /// value.
    pub fn assemble(
        &self,
        report_id: u64,
        mut listening_ports: Vec<ListeningPort>,
        mut established_connections: Vec<ConnectionEntry>,
        network_stats: BTreeMap<String, InterfaceCounters>,
        custom_metrics: Option<BTreeMap<String, MetricValue>>,
    ) -> Report {
        listening_ports.sort();
        listening_ports.dedup();
        established_connections.sort();
        established_connections.dedup();

        Report {
            header: ReportHeader {
                report_id,
                version: REPORT_VERSION.to_string(),
            },
            metrics: ReportMetrics {
                listening_ports,
                established_connections,
                network_stats,
            },
            custom_metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Protocol;

    #[test]
    fn ids_start_at_one_and_increment() {
        let mut builder = ReportBuilder::new();
        assert_eq!(builder.begin_cycle(), 1);
        assert_eq!(builder.begin_cycle(), 2);
        assert_eq!(builder.begin_cycle(), 3);
    }

    #[test]
    fn assemble_sorts_and_dedups_sets() {
        let builder = ReportBuilder::new();
        let ports = vec![
            ListeningPort {
                protocol: Protocol::Udp,
                port: 53,
                interface: "eth0".into(),
            },
            ListeningPort {
                protocol: Protocol::Tcp,
                port: 22,
                interface: "eth0".into(),
            },
            ListeningPort {
                protocol: Protocol::Tcp,
                port: 22,
                interface: "eth0".into(),
            },
        ];

        let report = builder.assemble(1, ports, Vec::new(), BTreeMap::new(), None);

        let ports = &report.metrics.listening_ports;
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].protocol, Protocol::Tcp);
        assert_eq!(report.header.report_id, 1);
        assert_eq!(report.header.version, REPORT_VERSION);
        assert!(report.custom_metrics.is_none());
    }
}
