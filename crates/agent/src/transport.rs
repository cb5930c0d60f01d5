//! Transport seam
//!
//! The core hands a finished payload and a topic name to a transport; how the
//! bytes reach the backend is not its concern. The shipped implementation
//! spools payloads to disk for an external publisher to pick up. A broker
//! client would implement the same trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Delivery seam for serialized reports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand a serialized report to the backend under the given topic.
    async fn publish(&self, topic: &str, report_id: u64, payload: &[u8]) -> Result<()>;
}

/// Transport that writes each payload to a spool directory, one file per
/// report id.
///
/// Files are named `<zero-padded report id>-<topic>` with path separators
/// flattened, so a directory listing reads in report order and gaps in the id
/// sequence stay visible on disk.
pub struct SpoolTransport {
    dir: PathBuf,
}

impl SpoolTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Transport for SpoolTransport {
    async fn publish(&self, topic: &str, report_id: u64, payload: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating spool dir {}", self.dir.display()))?;

        let name = format!("{report_id:08}-{}", topic.replace('/', "_"));
        let path = self.dir.join(name);
        fs::write(&path, payload)
            .await
            .with_context(|| format!("writing spooled report {}", path.display()))?;

        debug!(path = %path.display(), bytes = payload.len(), "report spooled");
        Ok(())
    }
}
