//! Collection cycle orchestration
//!
//! Ties the snapshot provider, delta engine, report builder, and optional
//! custom-metrics source into a single `sample` operation. One cycle runs at a
//! time (`&mut self`); the surrounding agent loop owns cadence, retry policy,
//! and whether a report is actually published.

use crate::custom::CustomMetricsSource;
use crate::engine::DeltaEngine;
use crate::error::CollectionError;
use crate::models::{MetricValue, Report, Snapshot};
use crate::report::ReportBuilder;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Source of raw point-in-time OS/network state.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Capture a fresh snapshot. Fails with [`CollectionError`] when an OS
    /// source is unreadable; the collector propagates this without touching
    /// engine state.
    async fn capture(&self) -> Result<Snapshot, CollectionError>;
}

/// Output of one successful collection cycle.
#[derive(Debug, Clone)]
pub struct SampledReport {
    pub report: Report,
    /// True for the cycle that established the delta baseline. By agent-loop
    /// policy a baseline report is not transmitted.
    pub is_baseline: bool,
}

/// Stateful sampler producing one report per cycle.
pub struct Collector {
    engine: DeltaEngine,
    builder: ReportBuilder,
    custom: Option<Box<dyn CustomMetricsSource>>,
}

impl Collector {
    /// Create a collector. Passing a custom-metrics source enables the
    /// `custom_metrics` section of every report; `None` omits it entirely.
    pub fn new(custom: Option<Box<dyn CustomMetricsSource>>) -> Self {
        Self {
            engine: DeltaEngine::new(),
            builder: ReportBuilder::new(),
            custom,
        }
    }

    /// Whether a baseline has been established.
    pub fn has_baseline(&self) -> bool {
        self.engine.has_baseline()
    }

    /// Run one collection cycle.
    ///
    /// On a capture failure the error propagates and the previous snapshot is
    /// left untouched, so the next successful cycle diffs against the last
    /// successful sample. The report id reserved for the failed cycle is not
    /// reused.
    pub async fn sample(
        &mut self,
        provider: &dyn SnapshotProvider,
    ) -> Result<SampledReport, CollectionError> {
        let report_id = self.builder.begin_cycle();

        let snapshot = provider.capture().await?;
        debug!(
            report_id,
            interfaces = snapshot.network_interfaces.len(),
            connections = snapshot.established_connections.len(),
            listening = snapshot.listening_ports.len(),
            "snapshot captured"
        );
        if let Some(process) = &snapshot.process_metrics {
            debug!(
                report_id,
                cpu_percent = process.cpu_percent,
                memory_bytes = process.memory_bytes,
                file_descriptors = process.file_descriptor_count,
                "agent process metrics"
            );
        }

        let custom_metrics = self.collect_custom(report_id).await;

        let listening_ports = snapshot.listening_ports.clone();
        let established_connections = snapshot.established_connections.clone();
        let (network_stats, is_baseline) = self.engine.observe(snapshot);

        let report = self.builder.assemble(
            report_id,
            listening_ports,
            established_connections,
            network_stats,
            custom_metrics,
        );

        Ok(SampledReport {
            report,
            is_baseline,
        })
    }

    /// Collect custom metrics when a source is configured. A failing source
    /// degrades this cycle only: the section is omitted and the core report
    /// still goes out.
    async fn collect_custom(&self, report_id: u64) -> Option<BTreeMap<String, MetricValue>> {
        match &self.custom {
            None => None,
            Some(source) => match source.collect().await {
                Ok(values) => Some(values),
                Err(e) => {
                    warn!(report_id, error = %e, "custom metrics collection failed, omitting for this cycle");
                    None
                }
            },
        }
    }
}
