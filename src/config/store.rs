//! The live configuration: last fully-applied snapshot plus observers.
//!
//! Readers load the current snapshot lock-free. Writers are serialized so
//! that the "old" side of every audit diff is exactly the snapshot that was
//! live before the change, never a half-applied one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use arc_swap::ArcSwap;

use crate::audit::{compute_diff, emit_diff, RecordSink};
use crate::config::snapshot::ConfigSnapshot;
use crate::observability::metrics::{self, ReloadOutcome};

type ChangeCallback = Box<dyn Fn(&ConfigSnapshot) + Send + Sync>;

pub struct ConfigStore {
    current: ArcSwap<ConfigSnapshot>,
    write_lock: Mutex<()>,
    observers: RwLock<Vec<ChangeCallback>>,
    applied_changes: AtomicU64,
}

impl ConfigStore {
    pub fn new(initial: ConfigSnapshot) -> Self {
        metrics::record_key_count(initial.len());
        Self {
            current: ArcSwap::from_pointee(initial),
            write_lock: Mutex::new(()),
            observers: RwLock::new(Vec::new()),
            applied_changes: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    /// Number of applies that actually changed something.
    pub fn change_count(&self) -> u64 {
        self.applied_changes.load(Ordering::Relaxed)
    }

    /// Register a callback run after every apply that changed at least one
    /// key. Callbacks run outside the writer lock, in registration order.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&ConfigSnapshot) + Send + Sync + 'static,
    {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    /// Make `next` the live snapshot, auditing the difference under `source`.
    ///
    /// Returns the number of changed top-level keys.
    pub fn replace<S>(&self, source: &str, next: ConfigSnapshot, sink: &S) -> usize
    where
        S: RecordSink + ?Sized,
    {
        let guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let applied = self.apply_locked(source, next, sink);
        drop(guard);

        self.notify(applied)
    }

    /// Layer `overlay` over the live snapshot and apply the result.
    pub fn merge<S>(&self, source: &str, overlay: &ConfigSnapshot, sink: &S) -> usize
    where
        S: RecordSink + ?Sized,
    {
        let guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let next = self.current.load().merge(overlay);
        let applied = self.apply_locked(source, next, sink);
        drop(guard);

        self.notify(applied)
    }

    fn apply_locked<S>(&self, source: &str, next: ConfigSnapshot, sink: &S) -> Applied
    where
        S: RecordSink + ?Sized,
    {
        let _span = tracing::info_span!("config_reload", source).entered();

        let previous = self.current.load_full();
        let changed = {
            let diff = compute_diff(&previous, &next);
            emit_diff(source, &diff, sink);
            diff.len()
        };

        if changed == 0 {
            metrics::record_reload(source, ReloadOutcome::Unchanged);
            tracing::debug!("Configuration unchanged");
            return Applied { changed, snapshot: None };
        }

        let next = Arc::new(next);
        self.current.store(Arc::clone(&next));
        self.applied_changes.fetch_add(1, Ordering::Relaxed);
        metrics::record_reload(source, ReloadOutcome::Changed);
        metrics::record_key_count(next.len());
        tracing::info!(changed_keys = changed, "Configuration applied");

        Applied {
            changed,
            snapshot: Some(next),
        }
    }

    fn notify(&self, applied: Applied) -> usize {
        if let Some(snapshot) = &applied.snapshot {
            let observers = self.observers.read().unwrap_or_else(PoisonError::into_inner);
            for callback in observers.iter() {
                callback(snapshot);
            }
        }
        applied.changed
    }
}

struct Applied {
    changed: usize,
    snapshot: Option<Arc<ConfigSnapshot>>,
}
