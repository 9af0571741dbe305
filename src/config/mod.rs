//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults / files (YAML, JSON, TOML) / env / remote
//!     → format.rs (parse into value.rs trees)
//!     → loader.rs (deep-merge layers, lowest priority first)
//!     → ConfigSnapshot (immutable)
//!     → store.rs (ArcSwap, shared via Arc)
//!
//! On reload (SIGHUP, admin API, remote watch):
//!     loader.rs / remote.rs produce a new snapshot
//!     → store.rs diffs it against the live one (audit::emit)
//!     → atomic swap of Arc<ConfigSnapshot>
//!     → observers registered with on_change run
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once loaded; a change is a whole new snapshot
//! - One dynamic value tree for every format, so diffs are format-agnostic
//! - Reads are lock-free; writers serialize so audits see a consistent "old"

pub mod error;
pub mod format;
pub mod loader;
pub mod remote;
pub mod snapshot;
pub mod store;
pub mod value;

pub use error::ConfigError;
pub use format::DocumentFormat;
pub use loader::{env_snapshot, load_file, ConfigLoader};
pub use remote::{HttpProvider, RemoteProvider};
pub use snapshot::ConfigSnapshot;
pub use store::ConfigStore;
pub use value::{ConfigValue, Scalar};
