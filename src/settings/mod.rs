//! Settings for the `config-audit` service itself.
//!
//! # Data Flow
//! ```text
//! config-audit.toml
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → lifecycle::startup wires sources, sinks, logging, metrics, admin
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so an empty file is a valid setup
//! - Validation separates syntactic (serde) from semantic checks
//! - Settings are read once at startup; only the audited configuration
//!   reloads

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, SettingsError};
pub use schema::{
    AdminSettings, AuditSettings, AuditSinkKind, LogFormat, LoggingSettings, MetricsSettings,
    RemoteSettings, Settings, SourcesSettings,
};
pub use validation::{validate_settings, ValidationError};
