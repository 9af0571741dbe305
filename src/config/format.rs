//! Document formats understood by the loader and remote providers.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::config::snapshot::ConfigSnapshot;
use crate::config::value::ConfigValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

impl DocumentFormat {
    /// Pick a parser from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        ext.parse()
            .map_err(|_| ConfigError::UnsupportedFormat(format!(".{}", ext)))
    }

    /// Parse a whole document into a snapshot. Blank documents are empty
    /// snapshots in every format.
    pub fn parse(self, content: &str, origin: &str) -> Result<ConfigSnapshot, ConfigError> {
        if content.trim().is_empty() {
            return Ok(ConfigSnapshot::new());
        }

        let parsed: Result<ConfigValue, String> = match self {
            DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            DocumentFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };

        let value = parsed.map_err(|message| ConfigError::Parse {
            origin: origin.to_owned(),
            format: self,
            message,
        })?;
        ConfigSnapshot::try_from(value)
    }
}

impl FromStr for DocumentFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "json" => Ok(DocumentFormat::Json),
            "toml" => Ok(DocumentFormat::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.to_owned())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentFormat::Yaml => "yaml",
            DocumentFormat::Json => "json",
            DocumentFormat::Toml => "toml",
        })
    }
}
