//! Settings schema definitions.
//!
//! These configure the `config-audit` service itself: where the audited
//! configuration comes from and where audit records, logs and metrics go.
//! All types derive Serde traits for deserialization from a TOML file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::DocumentFormat;

/// Root settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Configuration sources, lowest priority first.
    pub sources: SourcesSettings,

    /// Where audit records are delivered.
    pub audit: AuditSettings,

    /// Log level and format.
    pub logging: LoggingSettings,

    /// Prometheus endpoint.
    pub metrics: MetricsSettings,

    /// Admin HTTP API.
    pub admin: AdminSettings,
}

/// Configuration sources.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SourcesSettings {
    /// Files loaded in order; later files override earlier ones.
    pub files: Vec<PathBuf>,

    /// Environment variable prefix (e.g. "APP_"). Disabled when unset.
    pub env_prefix: Option<String>,

    /// Optional remote document, highest priority.
    pub remote: Option<RemoteSettings>,
}

/// Remote configuration document polled over HTTP.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteSettings {
    /// Document URL.
    pub url: String,

    /// Provider name, used as the audit `source` tag.
    #[serde(default = "default_remote_name")]
    pub name: String,

    /// Format of the document body.
    #[serde(default = "default_remote_format")]
    pub format: DocumentFormat,

    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_remote_name() -> String {
    "http".to_string()
}

fn default_remote_format() -> DocumentFormat {
    DocumentFormat::Json
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_remote_timeout_secs() -> u64 {
    10
}

/// Audit record destination.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// Structured log event on the `config_audit::audit` target.
    #[default]
    Log,
    /// JSON lines on stdout.
    Stdout,
    /// JSON lines appended to `audit.path`.
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuditSettings {
    pub sink: AuditSinkKind,

    /// Required when `sink = "file"`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive (e.g. "info" or "config_audit=debug").
    pub level: String,

    /// Pretty for development, JSON for production.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Enable the Prometheus endpoint.
    pub enabled: bool,

    /// Metrics endpoint bind address.
    pub address: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminSettings {
    /// Enable the admin API.
    pub enabled: bool,

    /// Admin API bind address.
    pub bind_address: String,

    /// Bearer token required on every admin request.
    pub api_key: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
            api_key: String::new(),
        }
    }
}
