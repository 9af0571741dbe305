//! Configuration change auditing.
//!
//! Loads layered configuration (files, environment, a remote document),
//! keeps the live snapshot, and on every reload emits one structured audit
//! record per changed top-level key with sensitive values masked.
//!
//! ```text
//!   files / env / remote ──▶ config::loader ──▶ ConfigSnapshot
//!                                                   │
//!   SIGHUP / admin / watch ──▶ lifecycle::reload ──▶ config::store
//!                                                   │  diff old vs new
//!                                                   ▼
//!                              audit::diff ─▶ audit::redact ─▶ AuditRecord ─▶ sink
//! ```

// Core
pub mod audit;
pub mod config;

// Service
pub mod admin;
pub mod lifecycle;
pub mod settings;

// Cross-cutting concerns
pub mod observability;

pub use audit::{compute_diff, emit, AuditRecord, ChangeKind, RecordSink};
pub use config::{ConfigSnapshot, ConfigStore, ConfigValue};
pub use lifecycle::Shutdown;
pub use settings::Settings;
