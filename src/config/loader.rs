//! Layered configuration loading.
//!
//! Sources are applied lowest priority first and deep-merged:
//! defaults → files (in order) → environment → remote provider.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::error::ConfigError;
use crate::config::format::DocumentFormat;
use crate::config::remote::RemoteProvider;
use crate::config::snapshot::ConfigSnapshot;

/// Separates nesting levels in environment variable names
/// (`APP_SERVER__PORT` → `server.port`).
pub const ENV_NESTING_SEPARATOR: &str = "__";

/// Builder describing where configuration comes from.
#[derive(Default, Clone)]
pub struct ConfigLoader {
    defaults: Option<ConfigSnapshot>,
    files: Vec<PathBuf>,
    env_prefix: Option<String>,
    remote: Option<Arc<dyn RemoteProvider>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest-priority values.
    pub fn with_defaults(mut self, defaults: ConfigSnapshot) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Later files override earlier ones.
    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Highest-priority source.
    pub fn with_remote(mut self, provider: Arc<dyn RemoteProvider>) -> Self {
        self.remote = Some(provider);
        self
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteProvider>> {
        self.remote.as_ref()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Merge defaults, files and environment. No I/O beyond the local disk.
    pub fn load_local(&self) -> Result<ConfigSnapshot, ConfigError> {
        let mut merged = self.defaults.clone().unwrap_or_default();

        for path in &self.files {
            merged = merged.merge(&load_file(path)?);
            tracing::debug!(path = %path.display(), "Loaded config file");
        }

        if let Some(prefix) = &self.env_prefix {
            merged = merged.merge(&env_snapshot(prefix, utf8_env_vars()));
        }

        Ok(merged)
    }

    /// Every layer, including the remote provider if one is configured.
    pub async fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        let (local, remote) = self.load_layers().await?;
        Ok(match remote {
            Some(remote) => local.merge(&remote),
            None => local,
        })
    }

    /// The local layers and the remote layer, not yet merged.
    pub async fn load_layers(&self) -> Result<(ConfigSnapshot, Option<ConfigSnapshot>), ConfigError> {
        let local = self.load_local()?;
        let remote = match &self.remote {
            Some(provider) => {
                let remote = provider.load().await?;
                tracing::info!(provider = provider.name(), keys = remote.len(), "Loaded remote configuration");
                Some(remote)
            }
            None => None,
        };
        Ok((local, remote))
    }
}

/// Load a single file, picking the parser from its extension.
pub fn load_file(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
    let format = DocumentFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(&content, &path.display().to_string())
}

/// The process environment, skipping variables whose name or value is not
/// valid UTF-8.
fn utf8_env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

/// Build a snapshot from the variables that start with `prefix`.
///
/// The prefix is stripped, the rest lowercased, and `__` splits nesting
/// levels. Values stay strings; the typed getters coerce on read.
pub fn env_snapshot<I>(prefix: &str, vars: I) -> ConfigSnapshot
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut snapshot = ConfigSnapshot::new();
    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let rest = rest.trim_start_matches('_').to_lowercase();
        let segments: Vec<&str> = rest
            .split(ENV_NESTING_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.is_empty() {
            continue;
        }
        snapshot.set(&segments.join("."), value);
    }
    snapshot
}
