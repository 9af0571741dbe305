//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and intervals
//! - Check that each enabled feature has what it needs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: &Settings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::DocumentFormat;
use crate::settings::schema::{AuditSinkKind, Settings};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sources.files: {path} has an unsupported extension")]
    UnsupportedFile { path: String },

    #[error("sources.env_prefix must not be empty")]
    EmptyEnvPrefix,

    #[error("sources.remote.url must be an http(s) URL, got {0:?}")]
    InvalidRemoteUrl(String),

    #[error("sources.remote.{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("audit.path is required when audit.sink = \"file\"")]
    MissingAuditPath,

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,
}

pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for path in &settings.sources.files {
        if DocumentFormat::from_path(path).is_err() {
            errors.push(ValidationError::UnsupportedFile {
                path: path.display().to_string(),
            });
        }
    }

    if matches!(settings.sources.env_prefix.as_deref(), Some("")) {
        errors.push(ValidationError::EmptyEnvPrefix);
    }

    if let Some(remote) = &settings.sources.remote {
        if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
            errors.push(ValidationError::InvalidRemoteUrl(remote.url.clone()));
        }
        if remote.poll_interval_secs == 0 {
            errors.push(ValidationError::ZeroDuration { field: "poll_interval_secs" });
        }
        if remote.timeout_secs == 0 {
            errors.push(ValidationError::ZeroDuration { field: "timeout_secs" });
        }
    }

    if settings.audit.sink == AuditSinkKind::File && settings.audit.path.is_none() {
        errors.push(ValidationError::MissingAuditPath);
    }

    if settings.metrics.enabled {
        check_address(&mut errors, "metrics.address", &settings.metrics.address);
    }

    if settings.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &settings.admin.bind_address);
        if settings.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::RemoteSettings;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let mut settings = Settings::default();
        settings.sources.files.push("config.ini".into());
        settings.sources.env_prefix = Some(String::new());
        settings.sources.remote = Some(RemoteSettings {
            url: "ftp://nope".into(),
            name: "http".into(),
            format: DocumentFormat::Json,
            poll_interval_secs: 0,
            timeout_secs: 5,
        });
        settings.audit.sink = AuditSinkKind::File;
        settings.metrics.enabled = true;
        settings.metrics.address = "not-an-address".into();
        settings.admin.enabled = true;

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::UnsupportedFile { path: "config.ini".into() },
                ValidationError::EmptyEnvPrefix,
                ValidationError::InvalidRemoteUrl("ftp://nope".into()),
                ValidationError::ZeroDuration { field: "poll_interval_secs" },
                ValidationError::MissingAuditPath,
                ValidationError::InvalidAddress {
                    field: "metrics.address",
                    value: "not-an-address".into(),
                },
                ValidationError::MissingApiKey,
            ]
        );
    }
}
