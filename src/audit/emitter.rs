//! Turns a snapshot diff into audit records and hands them to a sink.

use chrono::Utc;

use crate::audit::diff::{compute_diff, ConfigDiff};
use crate::audit::record::AuditRecord;
use crate::audit::sink::RecordSink;
use crate::config::ConfigSnapshot;
use crate::observability::metrics;

/// Diff `old` against `new` and emit one record per changed key.
///
/// Does nothing when the snapshots are deep-equal. Sink failures are logged
/// and counted, never returned.
pub fn emit<S>(source: &str, old: &ConfigSnapshot, new: &ConfigSnapshot, sink: &S)
where
    S: RecordSink + ?Sized,
{
    let diff = compute_diff(old, new);
    emit_diff(source, &diff, sink);
}

/// [`emit`] for a diff that has already been computed.
pub fn emit_diff<S>(source: &str, diff: &ConfigDiff<'_>, sink: &S)
where
    S: RecordSink + ?Sized,
{
    if diff.is_empty() {
        return;
    }

    let emitted_at = Utc::now();
    for entry in diff.values() {
        let record = AuditRecord::from_entry(source, entry, emitted_at);
        metrics::record_config_change(source, record.change);

        if let Err(e) = sink.consume(&record) {
            metrics::record_sink_failure(source);
            tracing::warn!(
                source,
                key = %record.key,
                error = %e,
                "Failed to emit config audit record"
            );
        }
    }
}
