//! Core library for the device telemetry agent
//!
//! This crate provides the sampling and delta-reporting engine:
//! - Snapshot and report data model
//! - Delta computation with wraparound handling
//! - Short/long wire field naming
//! - Report assembly with monotonic report ids
//! - Canonical JSON and compact CBOR encodings
//!
//! Transport, scheduling, and raw OS metric acquisition live in the agent
//! binary; this crate consumes them through the [`collector::SnapshotProvider`]
//! and [`custom::CustomMetricsSource`] capabilities.

pub mod collector;
pub mod custom;
pub mod engine;
pub mod error;
pub mod models;
pub mod naming;
pub mod report;
pub mod wire;


pub use collector::{Collector, SampledReport, SnapshotProvider};
pub use custom::CustomMetricsSource;
pub use engine::DeltaEngine;
pub use error::{CollectionError, EncodingError};
pub use models::*;
pub use naming::{Field, NamingMode};
pub use report::ReportBuilder;
