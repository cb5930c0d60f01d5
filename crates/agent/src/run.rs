//! Agent collection loop
//!
//! Owns the policies the core deliberately does not: sampling cadence, the
//! first-sample baseline suppression, dry-run versus live publishing, and
//! continuing past failed cycles. A failed cycle produces no report and no
//! transport activity; it never takes the agent down.

use crate::config::{AgentConfig, WireFormat};
use crate::provider::{ProcessMetricsSource, ProcfsProvider};
use crate::transport::{SpoolTransport, Transport};
use anyhow::Result;
use sentinel_lib::{wire, Collector, CustomMetricsSource, SampledReport, SnapshotProvider};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

/// Run the collection loop until ctrl-c.
pub async fn run(config: AgentConfig) -> Result<()> {
    let provider = ProcfsProvider::new();
    let custom: Option<Box<dyn CustomMetricsSource>> = if config.custom_metrics {
        Some(Box::new(ProcessMetricsSource::new()))
    } else {
        None
    };
    let mut collector = Collector::new(custom);
    let transport = SpoolTransport::new(&config.spool_dir);
    let topic = config.topic();

    info!(topic = %topic, interval_secs = config.interval_secs, "starting collection loop");

    let mut ticker = interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&config, &mut collector, &provider, &transport, &topic).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping collection loop");
                break;
            }
        }
    }

    Ok(())
}

/// One collection cycle: sample, encode, publish. All failures are logged and
/// absorbed; retry policy is simply the next scheduled tick.
async fn run_cycle(
    config: &AgentConfig,
    collector: &mut Collector,
    provider: &dyn SnapshotProvider,
    transport: &dyn Transport,
    topic: &str,
) {
    let sampled = match collector.sample(provider).await {
        Ok(sampled) => sampled,
        Err(e) => {
            warn!(error = %e, "collection failed, skipping cycle");
            return;
        }
    };

    let SampledReport { report, is_baseline } = sampled;
    let report_id = report.header.report_id;

    if is_baseline {
        info!(report_id, "baseline established, withholding first report");
        return;
    }

    if config.dry_run {
        match wire::to_json_string_pretty(&report, config.naming_mode()) {
            Ok(text) => println!("{text}"),
            Err(e) => warn!(report_id, error = %e, "encoding failed, dropping report"),
        }
        return;
    }

    let payload = match config.format {
        WireFormat::Json => {
            wire::to_json_string(&report, config.naming_mode()).map(String::into_bytes)
        }
        WireFormat::Cbor => wire::to_cbor(&report, config.naming_mode()),
    };

    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            warn!(report_id, error = %e, "encoding failed, dropping report");
            return;
        }
    };

    match transport.publish(topic, report_id, &payload).await {
        Ok(()) => info!(report_id, bytes = payload.len(), "report published"),
        Err(e) => warn!(report_id, error = %e, "publish failed, report dropped"),
    }
}
