//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_changes_total` (counter): changed keys by source and change kind
//! - `config_reloads_total` (counter): reload attempts by source and outcome
//! - `config_audit_sink_failures_total` (counter): records a sink rejected
//! - `config_keys` (gauge): top-level keys in the current snapshot

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::audit::ChangeKind;

/// Outcome label for [`record_reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Changed,
    Unchanged,
    Failed,
}

impl ReloadOutcome {
    fn as_str(self) -> &'static str {
        match self {
            ReloadOutcome::Changed => "changed",
            ReloadOutcome::Unchanged => "unchanged",
            ReloadOutcome::Failed => "failed",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_config_change(source: &str, change: ChangeKind) {
    metrics::counter!(
        "config_changes_total",
        "source" => source.to_owned(),
        "change" => change.as_str()
    )
    .increment(1);
}

pub fn record_reload(source: &str, outcome: ReloadOutcome) {
    metrics::counter!(
        "config_reloads_total",
        "source" => source.to_owned(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_sink_failure(source: &str) {
    metrics::counter!("config_audit_sink_failures_total", "source" => source.to_owned()).increment(1);
}

pub fn record_key_count(count: usize) {
    metrics::gauge!("config_keys").set(count as f64);
}
