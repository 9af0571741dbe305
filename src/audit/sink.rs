//! Consumers of audit records.

use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;

use crate::audit::record::{AuditRecord, CONFIG_CHANGE};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write audit record: {0}")]
    Io(#[from] io::Error),

    #[error("audit sink rejected record: {0}")]
    Rejected(String),
}

/// Receives one [`AuditRecord`] per changed key.
///
/// Errors are reported back to the emitter, which logs and counts them but
/// never surfaces them to whoever triggered the reload.
pub trait RecordSink: Send + Sync {
    fn consume(&self, record: &AuditRecord) -> Result<(), SinkError>;
}

impl<F> RecordSink for F
where
    F: Fn(&AuditRecord) -> Result<(), SinkError> + Send + Sync,
{
    fn consume(&self, record: &AuditRecord) -> Result<(), SinkError> {
        self(record)
    }
}

/// Emits every record as a structured `tracing` event on the
/// `config_audit::audit` target, with the JSON line as message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn consume(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let line = record.to_json_line()?;
        tracing::info!(
            target: "config_audit::audit",
            event = CONFIG_CHANGE,
            source = %record.source,
            key = %record.key,
            old = %record.old,
            new = %record.new,
            change = %record.change,
            timestamp = %record.timestamp,
            "{}",
            line
        );
        Ok(())
    }
}

/// Line-delimited JSON written to any writer, flushed per record.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonLinesSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl JsonLinesSink<File> {
    /// Append to `path`, creating it if needed.
    pub fn append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn consume(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let line = record.to_json_line()?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Rejected("writer lock poisoned".into()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}
