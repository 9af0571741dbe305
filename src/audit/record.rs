//! The externally emitted audit record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::diff::{ChangeKind, DiffEntry};
use crate::audit::redact::redact;
use crate::config::ConfigValue;

/// Constant `type` tag of every record.
pub const CONFIG_CHANGE: &str = "config_change";

/// Rendering of a value that does not exist on one side of the change.
pub const ABSENT: &str = "<nil>";

/// One detected configuration change, rendered and redacted.
///
/// Serializes as a flat object with the fields `type`, `source`, `key`,
/// `old`, `new`, `change` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub key: String,
    pub old: String,
    pub new: String,
    pub change: ChangeKind,
    /// Emission time, RFC3339.
    pub timestamp: String,
}

impl AuditRecord {
    pub fn from_entry(source: &str, entry: &DiffEntry<'_>, emitted_at: DateTime<Utc>) -> Self {
        Self {
            event_type: CONFIG_CHANGE.to_owned(),
            source: source.to_owned(),
            key: entry.key.to_owned(),
            old: render(entry.key, entry.old),
            new: render(entry.key, entry.new),
            change: entry.change_kind(),
            timestamp: emitted_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn render(key: &str, value: Option<&ConfigValue>) -> String {
    match value {
        Some(value) => redact(key, value.to_string()),
        None => ABSENT.to_owned(),
    }
}
