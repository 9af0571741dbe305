//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and gauges via `metrics`)
//!
//! Consumers:
//!     → Log aggregation (stderr, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Audit records are also log events, on their own target
//!   (`config_audit::audit`) so they can be filtered or routed separately
//! - Metric updates are no-ops until an exporter is installed, so library
//!   users and tests pay nothing

pub mod logging;
pub mod metrics;
