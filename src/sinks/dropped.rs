//! # Dropped-Message Log
//!
//! Append-only record of payloads no handler was bound for.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::error::{LogistikError, LogistikResult};

/// Tracing target dropped payloads are logged under
pub const DROPPED_TARGET: &str = "logistik::dropped";

#[async_trait]
pub trait DroppedMessageLog: Send + Sync + 'static {
    async fn append(&self, payload: &Value) -> LogistikResult<()>;
}

/// Logs dropped payloads on the `logistik::dropped` target so they can be
/// routed to their own file or index by the subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDroppedLog;

#[async_trait]
impl DroppedMessageLog for TracingDroppedLog {
    async fn append(&self, payload: &Value) -> LogistikResult<()> {
        info!(target: DROPPED_TARGET, payload = %payload, "dropped message");
        Ok(())
    }
}

/// Appends each dropped payload as one JSON line to a file
pub struct JsonLinesDroppedLog {
    path: PathBuf,
    writer: Mutex<RollingFileAppender>,
}

impl std::fmt::Debug for JsonLinesDroppedLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesDroppedLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonLinesDroppedLog {
    /// Open (creating if needed) the log file in append mode
    pub async fn open(path: impl AsRef<Path>) -> LogistikResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                LogistikError::Sink(format!("not a file path: {}", path.display()))
            })?
            .to_string();
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                tokio::fs::create_dir_all(parent).await?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };

        let writer = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(&dir)
            .map_err(|e| {
                LogistikError::Sink(format!("could not open {}: {e}", path.display()))
            })?;

        debug!(path = %path.display(), "dropped-message log opened");
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DroppedMessageLog for JsonLinesDroppedLog {
    async fn append(&self, payload: &Value) -> LogistikResult<()> {
        let mut line = payload.to_string();
        line.push('\n');

        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps dropped payloads in memory
#[derive(Debug, Default)]
pub struct MemoryDroppedLog {
    entries: Mutex<Vec<Value>>,
}

impl MemoryDroppedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Value> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl DroppedMessageLog for MemoryDroppedLog {
    async fn append(&self, payload: &Value) -> LogistikResult<()> {
        self.entries.lock().push(payload.clone());
        Ok(())
    }
}
