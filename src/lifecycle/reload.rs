//! Reload orchestration: reload → diff → emit → notify.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::audit::RecordSink;
use crate::config::{ConfigError, ConfigLoader, ConfigSnapshot, ConfigStore};
use crate::lifecycle::ShutdownListener;
use crate::observability::metrics::{self, ReloadOutcome};

/// Audit source tag for reloads of the local layers.
pub const LOCAL_SOURCE: &str = "file";

/// Applies reloads to a [`ConfigStore`], auditing each one.
///
/// Keeps the local and remote layers separately. Every apply recomposes
/// `local.merge(remote)` and replaces the live snapshot, so a key that
/// disappears from either layer is audited as a DELETE under that layer's
/// source. The layers lock is held across compose and apply and is always
/// taken before the store's writer lock.
pub struct Reloader {
    store: Arc<ConfigStore>,
    loader: ConfigLoader,
    sink: Arc<dyn RecordSink>,
    layers: Mutex<Layers>,
}

struct Layers {
    local: ConfigSnapshot,
    remote: Option<ConfigSnapshot>,
}

impl Layers {
    fn compose(&self) -> ConfigSnapshot {
        match &self.remote {
            Some(remote) => self.local.merge(remote),
            None => self.local.clone(),
        }
    }
}

impl Reloader {
    /// The store's current snapshot is taken as the local layer.
    pub fn new(store: Arc<ConfigStore>, loader: ConfigLoader, sink: Arc<dyn RecordSink>) -> Self {
        let local = ConfigSnapshot::clone(&store.current());
        Self {
            store,
            loader,
            sink,
            layers: Mutex::new(Layers { local, remote: None }),
        }
    }

    /// Record the layers the store's current snapshot was composed from.
    pub fn with_layers(self, local: ConfigSnapshot, remote: Option<ConfigSnapshot>) -> Self {
        *self.lock_layers() = Layers { local, remote };
        self
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Re-read defaults, files and environment and apply the result.
    ///
    /// On failure the live configuration is left untouched.
    pub fn reload_local(&self) -> Result<usize, ConfigError> {
        let mut layers = self.lock_layers();

        let local = match self.loader.load_local() {
            Ok(local) => local,
            Err(e) => {
                metrics::record_reload(LOCAL_SOURCE, ReloadOutcome::Failed);
                tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                return Err(e);
            }
        };

        layers.local = local;
        Ok(self.store.replace(LOCAL_SOURCE, layers.compose(), self.sink.as_ref()))
    }

    /// Replace the remote layer with a snapshot pushed by `provider`.
    pub fn apply_remote(&self, provider: &str, snapshot: ConfigSnapshot) -> usize {
        let mut layers = self.lock_layers();
        layers.remote = Some(snapshot);
        self.store.replace(provider, layers.compose(), self.sink.as_ref())
    }

    fn lock_layers(&self) -> MutexGuard<'_, Layers> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drains reload triggers and remote updates until shutdown.
pub struct ReloadLoop {
    reloader: Arc<Reloader>,
    triggers: mpsc::UnboundedReceiver<()>,
    remote: Option<(String, mpsc::UnboundedReceiver<ConfigSnapshot>)>,
}

impl ReloadLoop {
    pub fn new(reloader: Arc<Reloader>, triggers: mpsc::UnboundedReceiver<()>) -> Self {
        Self {
            reloader,
            triggers,
            remote: None,
        }
    }

    /// Also apply snapshots from a remote provider's watch task.
    pub fn with_remote(mut self, provider: impl Into<String>, updates: mpsc::UnboundedReceiver<ConfigSnapshot>) -> Self {
        self.remote = Some((provider.into(), updates));
        self
    }

    pub async fn run(self, mut shutdown: ShutdownListener) {
        let ReloadLoop {
            reloader,
            mut triggers,
            mut remote,
        } = self;

        tracing::info!("Reload loop started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                Some(()) = triggers.recv() => {
                    // Failures are logged by the reloader.
                    let _ = reloader.reload_local();
                }
                Some((provider, snapshot)) = next_remote(&mut remote) => {
                    reloader.apply_remote(&provider, snapshot);
                }
            }
        }
        tracing::info!("Reload loop stopped");
    }
}

async fn next_remote(
    remote: &mut Option<(String, mpsc::UnboundedReceiver<ConfigSnapshot>)>,
) -> Option<(String, ConfigSnapshot)> {
    match remote {
        Some((provider, updates)) => updates.recv().await.map(|snapshot| (provider.clone(), snapshot)),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditRecord, ChangeKind, SinkError};

    type Seen = Arc<Mutex<Vec<(String, String, ChangeKind)>>>;

    fn discard() -> Arc<dyn RecordSink> {
        Arc::new(|_: &AuditRecord| -> Result<(), SinkError> { Ok(()) })
    }

    fn collecting() -> (Arc<dyn RecordSink>, Seen) {
        let seen: Seen = Arc::default();
        let records = Arc::clone(&seen);
        let sink = move |r: &AuditRecord| -> Result<(), SinkError> {
            records
                .lock()
                .unwrap()
                .push((r.source.clone(), r.key.clone(), r.change));
            Ok(())
        };
        (Arc::new(sink), seen)
    }

    #[test]
    fn test_local_reload_keeps_remote_overlay() {
        let loader = ConfigLoader::new().with_defaults(ConfigSnapshot::new().with("a", 1).with("b", 1));
        let store = Arc::new(ConfigStore::new(loader.load_local().unwrap()));
        let reloader = Reloader::new(Arc::clone(&store), loader, discard());

        assert_eq!(reloader.apply_remote("apollo", ConfigSnapshot::new().with("remote_only", true)), 1);
        assert_eq!(reloader.reload_local().unwrap(), 0);
        assert_eq!(store.current().get_bool("remote_only"), Some(true));
    }

    #[test]
    fn test_failed_reload_keeps_current() {
        let loader = ConfigLoader::new().with_file("/definitely/missing.yaml");
        let store = Arc::new(ConfigStore::new(ConfigSnapshot::new().with("a", 1)));
        let reloader = Reloader::new(Arc::clone(&store), loader, discard());

        assert!(reloader.reload_local().is_err());
        assert_eq!(store.current().get_int("a"), Some(1));
    }

    #[test]
    fn test_key_removed_remotely_is_deleted_under_provider() {
        let loader = ConfigLoader::new().with_defaults(ConfigSnapshot::new().with("a", 1));
        let store = Arc::new(ConfigStore::new(loader.load_local().unwrap()));
        let (sink, seen) = collecting();
        let reloader = Reloader::new(Arc::clone(&store), loader, sink);

        reloader.apply_remote("apollo", ConfigSnapshot::new().with("feature", true));
        assert_eq!(reloader.apply_remote("apollo", ConfigSnapshot::new()), 1);
        assert!(!store.current().exists("feature"));

        assert_eq!(reloader.reload_local().unwrap(), 0);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("apollo".to_string(), "feature".to_string(), ChangeKind::Add),
                ("apollo".to_string(), "feature".to_string(), ChangeKind::Delete),
            ]
        );
    }

    #[test]
    fn test_remote_key_overriding_local_falls_back_when_removed() {
        let loader = ConfigLoader::new().with_defaults(ConfigSnapshot::new().with("level", "info"));
        let store = Arc::new(ConfigStore::new(loader.load_local().unwrap()));
        let reloader = Reloader::new(Arc::clone(&store), loader, discard());

        reloader.apply_remote("apollo", ConfigSnapshot::new().with("level", "debug"));
        assert_eq!(store.current().get_string("level").as_deref(), Some("debug"));
        reloader.apply_remote("apollo", ConfigSnapshot::new());
        assert_eq!(store.current().get_string("level").as_deref(), Some("info"));
    }

    #[test]
    fn test_initial_layers_are_respected() {
        let loader = ConfigLoader::new().with_defaults(ConfigSnapshot::new().with("a", 1));
        let local = loader.load_local().unwrap();
        let remote = ConfigSnapshot::new().with("r", 2);
        let store = Arc::new(ConfigStore::new(local.merge(&remote)));
        let (sink, seen) = collecting();
        let reloader = Reloader::new(Arc::clone(&store), loader, sink).with_layers(local, Some(remote));

        assert_eq!(reloader.apply_remote("apollo", ConfigSnapshot::new()), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("apollo".to_string(), "r".to_string(), ChangeKind::Delete)]
        );
    }

    #[test]
    fn test_concurrent_local_reloads_never_drop_remote_keys() {
        let loader = ConfigLoader::new().with_defaults(ConfigSnapshot::new().with("a", 1));
        let store = Arc::new(ConfigStore::new(loader.load_local().unwrap()));
        let (sink, seen) = collecting();
        let reloader = Arc::new(Reloader::new(Arc::clone(&store), loader, sink));

        let local = {
            let reloader = Arc::clone(&reloader);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    reloader.reload_local().unwrap();
                }
            })
        };
        let remote = {
            let reloader = Arc::clone(&reloader);
            std::thread::spawn(move || {
                for i in 0..50 {
                    reloader.apply_remote("apollo", ConfigSnapshot::new().with("k", i));
                }
            })
        };
        local.join().unwrap();
        remote.join().unwrap();

        assert_eq!(store.current().get_int("k"), Some(49));
        assert!(seen
            .lock()
            .unwrap()
            .iter()
            .all(|(source, _, _)| source == "apollo"));
    }
}
