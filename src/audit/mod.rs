//! Configuration change auditing.
//!
//! # Data Flow
//! ```text
//! old snapshot ─┐
//!               ├─→ diff.rs (top-level keys, deep equality)
//! new snapshot ─┘       → emitter.rs (one record per changed key)
//!                           → record.rs (render + redact.rs masking)
//!                           → sink.rs (tracing / JSON lines / closure)
//! ```
//!
//! # Design Decisions
//! - Everything here is pure and synchronous; the caller owns the "current"
//!   snapshot and its locking (see `config::store`)
//! - Redaction runs after comparison, so masking never hides a change
//! - Sink errors are logged and counted, never propagated

pub mod diff;
pub mod emitter;
pub mod record;
pub mod redact;
pub mod sink;

pub use diff::{compute_diff, ChangeKind, ConfigDiff, DiffEntry};
pub use emitter::{emit, emit_diff};
pub use record::{AuditRecord, ABSENT, CONFIG_CHANGE};
pub use redact::{is_sensitive, redact, redact_snapshot, redact_value, MASK};
pub use sink::{JsonLinesSink, RecordSink, SinkError, TracingSink};
