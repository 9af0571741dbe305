//! Error type for configuration loading and access.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::format::DocumentFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin} as {format}: {message}")]
    Parse {
        origin: String,
        format: DocumentFormat,
        message: String,
    },

    #[error("unsupported config file format: {0} (supported: .yaml, .yml, .json, .toml)")]
    UnsupportedFormat(String),

    #[error("configuration root must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("remote provider {provider} failed: {message}")]
    Remote { provider: String, message: String },

    #[error("failed to unmarshal {path:?}: {source}")]
    Unmarshal {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
