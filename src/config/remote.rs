//! Remote configuration providers.
//!
//! A provider is the highest-priority layer. Besides the initial `load`, it
//! runs a `watch` task that pushes complete snapshots whenever the remote
//! document changes; the reload loop makes each one the new remote layer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::audit::compute_diff;
use crate::config::error::ConfigError;
use crate::config::format::DocumentFormat;
use crate::config::snapshot::ConfigSnapshot;
use crate::lifecycle::ShutdownListener;

#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Name used as the audit `source` tag.
    fn name(&self) -> &str;

    /// Fetch the current remote document.
    async fn load(&self) -> Result<ConfigSnapshot, ConfigError>;

    /// Push snapshots into `updates` until shutdown or until the receiver is
    /// dropped.
    async fn watch(
        &self,
        updates: mpsc::UnboundedSender<ConfigSnapshot>,
        shutdown: ShutdownListener,
    ) -> Result<(), ConfigError>;
}

/// Polls a document over HTTP and forwards it when it changes.
pub struct HttpProvider {
    name: String,
    url: String,
    format: DocumentFormat,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl HttpProvider {
    pub const DEFAULT_NAME: &'static str = "http";
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

    pub fn new(url: impl Into<String>, format: DocumentFormat, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Remote {
                provider: Self::DEFAULT_NAME.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            name: Self::DEFAULT_NAME.to_string(),
            url: url.into(),
            format,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            client,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn remote_error(&self, err: impl ToString) -> ConfigError {
        ConfigError::Remote {
            provider: self.name.clone(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl RemoteProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.remote_error(e))?
            .text()
            .await
            .map_err(|e| self.remote_error(e))?;

        self.format.parse(&body, &self.url)
    }

    async fn watch(
        &self,
        updates: mpsc::UnboundedSender<ConfigSnapshot>,
        mut shutdown: ShutdownListener,
    ) -> Result<(), ConfigError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen: Option<ConfigSnapshot> = None;

        tracing::info!(provider = %self.name, url = %self.url, interval = ?self.poll_interval, "Remote config watcher started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = match self.load().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(provider = %self.name, error = %e, "Remote config fetch failed. Keeping current configuration.");
                    continue;
                }
            };

            let changed = last_seen
                .as_ref()
                .map_or(true, |previous| !compute_diff(previous, &snapshot).is_empty());
            if !changed {
                continue;
            }

            last_seen = Some(snapshot.clone());
            if updates.send(snapshot).is_err() {
                tracing::debug!(provider = %self.name, "Update receiver dropped, stopping watcher");
                break;
            }
        }

        tracing::info!(provider = %self.name, "Remote config watcher stopped");
        Ok(())
    }
}
