//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → sink + loader → initial snapshot → background tasks
//!
//! Reload (reload.rs):
//!     SIGHUP / admin API → reload local layers → ConfigStore::replace ("file")
//!     remote watch       → replace remote layer → ConfigStore::replace (provider name)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Trigger config reload
//!
//! Shutdown (shutdown.rs):
//!     trigger → reload loop, remote watch and admin server stop → exit
//! ```
//!
//! # Design Decisions
//! - A failed reload never replaces the live configuration
//! - One shutdown signal is shared by every background task

pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use reload::{ReloadLoop, Reloader, LOCAL_SOURCE};
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::{LifecycleSignal, Signals};
pub use startup::StartupError;
