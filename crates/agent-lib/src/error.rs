//! Error taxonomy for the sampling and reporting core
//!
//! `CollectionError` is recoverable at cycle granularity: the agent loop skips
//! or degrades the current cycle and engine state from prior successful cycles
//! stays untouched. `EncodingError` drops the cycle's report only; the sample
//! itself succeeded, so the engine baseline is not rolled back.

use thiserror::Error;

/// Raw metric acquisition failed (snapshot provider or custom-metrics source).
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The metric source exists but cannot be read right now.
    #[error("metric source unavailable: {0}")]
    Unavailable(String),

    /// An I/O error while reading the metric source.
    #[error("failed to read metric source")]
    Io(#[from] std::io::Error),

    /// The source produced data the provider could not interpret.
    #[error("malformed metric data: {0}")]
    Malformed(String),
}

/// A built report could not be serialized or decoded.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Custom metric carried a NaN or infinite value.
    #[error("non-finite value for custom metric {name}: {value}")]
    NonFinite { name: String, value: f64 },

    #[error("json encoding failed")]
    Json(#[from] serde_json::Error),

    #[error("cbor encoding failed: {0}")]
    Cbor(String),

    /// A decoded payload did not match the report schema.
    #[error("malformed report payload: {0}")]
    Malformed(String),
}
