//! Custom metrics capability
//!
//! Optional plug-in point for metrics beyond the core schema. A source is
//! injected at collector construction; when none is configured the report
//! omits the `custom_metrics` field entirely. A failing source degrades the
//! current cycle only, it never aborts the core report.

use crate::error::CollectionError;
use crate::models::MetricValue;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Producer of additional named metrics merged into each report.
#[async_trait]
pub trait CustomMetricsSource: Send + Sync {
    /// Collect the current custom metric values.
    async fn collect(&self) -> Result<BTreeMap<String, MetricValue>, CollectionError>;
}

/// Source with a fixed set of values, mainly useful for wiring tests and
/// dry-run demos.
pub struct StaticMetricsSource {
    values: BTreeMap<String, MetricValue>,
}

impl StaticMetricsSource {
    pub fn new(values: BTreeMap<String, MetricValue>) -> Self {
        Self { values }
    }
}

#[async_trait]
impl CustomMetricsSource for StaticMetricsSource {
    async fn collect(&self) -> Result<BTreeMap<String, MetricValue>, CollectionError> {
        Ok(self.values.clone())
    }
}
