//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the sink and loader from settings
//! - Load the initial snapshot
//! - Start background tasks (remote watch, admin API, signal handling)
//! - Run the reload loop until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, including an unreachable remote
//! - Background tasks share one [`Shutdown`] and are awaited before exit

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::admin::{self, AdminState};
use crate::audit::{JsonLinesSink, RecordSink, TracingSink};
use crate::config::{
    ConfigError, ConfigLoader, ConfigSnapshot, ConfigStore, HttpProvider, RemoteProvider,
};
use crate::lifecycle::reload::{ReloadLoop, Reloader};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::{LifecycleSignal, Signals};
use crate::observability::metrics;
use crate::settings::{AuditSettings, AuditSinkKind, Settings, SourcesSettings};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("audit.path is required when audit.sink = \"file\"")]
    MissingAuditPath,
}

/// Build the layered loader described by `[sources]`.
pub fn build_loader(sources: &SourcesSettings) -> Result<ConfigLoader, ConfigError> {
    let mut loader = ConfigLoader::new().with_files(sources.files.iter().cloned());

    if let Some(prefix) = &sources.env_prefix {
        loader = loader.with_env(prefix.clone());
    }

    if let Some(remote) = &sources.remote {
        let provider = HttpProvider::new(
            remote.url.clone(),
            remote.format,
            Duration::from_secs(remote.timeout_secs),
        )?
        .with_name(remote.name.clone())
        .with_poll_interval(Duration::from_secs(remote.poll_interval_secs));
        loader = loader.with_remote(Arc::new(provider));
    }

    Ok(loader)
}

/// Build the audit sink described by `[audit]`.
pub fn build_sink(audit: &AuditSettings) -> Result<Arc<dyn RecordSink>, StartupError> {
    let sink: Arc<dyn RecordSink> = match audit.sink {
        AuditSinkKind::Log => Arc::new(TracingSink),
        AuditSinkKind::Stdout => Arc::new(JsonLinesSink::stdout()),
        AuditSinkKind::File => {
            let path = audit.path.as_deref().ok_or(StartupError::MissingAuditPath)?;
            Arc::new(JsonLinesSink::append(path)?)
        }
    };
    Ok(sink)
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

/// Run the audit service until SIGINT/SIGTERM.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "config-audit starting");

    if settings.metrics.enabled {
        let addr = parse_addr("metrics.address", &settings.metrics.address)?;
        metrics::init_metrics(addr)?;
    }

    let sink = build_sink(&settings.audit)?;
    let loader = build_loader(&settings.sources)?;
    let remote = loader.remote().cloned();

    let (local, remote_layer) = loader.load_layers().await?;
    let initial = match &remote_layer {
        Some(remote_layer) => local.merge(remote_layer),
        None => local.clone(),
    };
    tracing::info!(keys = initial.len(), files = loader.files().len(), "Initial configuration loaded");

    let store = Arc::new(ConfigStore::new(initial));
    let reloader = Arc::new(Reloader::new(store, loader, sink).with_layers(local, remote_layer));
    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
    let mut reload_loop = ReloadLoop::new(Arc::clone(&reloader), trigger_rx);

    if let Some(provider) = remote {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        reload_loop = reload_loop.with_remote(provider.name(), updates_rx);
        tasks.push(spawn_remote_watch(provider, updates_tx, &shutdown));
    }

    if settings.admin.enabled {
        let addr = parse_addr("admin.bind_address", &settings.admin.bind_address)?;
        let listener = TcpListener::bind(addr).await?;
        let state = AdminState::new(Arc::clone(&reloader), &settings.admin.api_key);
        let listener_shutdown = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, listener_shutdown).await {
                tracing::error!(error = %e, "Admin server failed");
            }
        }));
    }

    let mut signals = Signals::install()?;
    let signal_shutdown = shutdown.clone();
    tasks.push(tokio::spawn(async move {
        let mut stopped = signal_shutdown.subscribe();
        loop {
            tokio::select! {
                _ = stopped.recv() => break,
                signal = signals.recv() => match signal {
                    LifecycleSignal::Reload => {
                        tracing::info!("SIGHUP received, reloading configuration");
                        if trigger_tx.send(()).is_err() {
                            break;
                        }
                    }
                    LifecycleSignal::Terminate => {
                        tracing::info!("Shutdown signal received");
                        signal_shutdown.trigger();
                        break;
                    }
                },
            }
        }
    }));

    reload_loop.run(shutdown.subscribe()).await;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }

    tracing::info!(changes = reloader.store().change_count(), "Shutdown complete");
    Ok(())
}

fn spawn_remote_watch(
    provider: Arc<dyn RemoteProvider>,
    updates: mpsc::UnboundedSender<ConfigSnapshot>,
    shutdown: &Shutdown,
) -> tokio::task::JoinHandle<()> {
    let listener = shutdown.subscribe();
    tokio::spawn(async move {
        if let Err(e) = provider.watch(updates, listener).await {
            tracing::error!(provider = provider.name(), error = %e, "Remote watcher failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentFormat;
    use crate::settings::RemoteSettings;

    #[test]
    fn test_build_loader_from_sources() {
        let sources = SourcesSettings {
            files: vec!["a.yaml".into(), "b.toml".into()],
            env_prefix: Some("APP_".to_string()),
            remote: Some(RemoteSettings {
                url: "http://127.0.0.1:1/config".to_string(),
                name: "apollo".to_string(),
                format: DocumentFormat::Yaml,
                poll_interval_secs: 5,
                timeout_secs: 1,
            }),
        };

        let loader = build_loader(&sources).unwrap();
        assert_eq!(loader.files().len(), 2);
        assert_eq!(loader.remote().map(|p| p.name()), Some("apollo"));
    }

    #[test]
    fn test_build_file_sink_requires_path() {
        let audit = AuditSettings {
            sink: AuditSinkKind::File,
            path: None,
        };
        assert!(matches!(build_sink(&audit), Err(StartupError::MissingAuditPath)));

        let dir = tempfile::tempdir().unwrap();
        let audit = AuditSettings {
            sink: AuditSinkKind::File,
            path: Some(dir.path().join("audit.jsonl")),
        };
        assert!(build_sink(&audit).is_ok());
    }
}
