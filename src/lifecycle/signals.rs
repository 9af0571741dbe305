//! OS signal handling.
//!
//! SIGHUP asks for a configuration reload; SIGINT/SIGTERM (Ctrl+C on other
//! platforms) ask for shutdown.

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// What an OS signal asks the service to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    Reload,
    Terminate,
}

pub struct Signals {
    #[cfg(unix)]
    hangup: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl Signals {
    /// Register handlers. Must be called from within a Tokio runtime.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            hangup: signal(SignalKind::hangup())?,
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(unix)]
    pub async fn recv(&mut self) -> LifecycleSignal {
        tokio::select! {
            Some(()) = self.hangup.recv() => LifecycleSignal::Reload,
            Some(()) = self.terminate.recv() => LifecycleSignal::Terminate,
            _ = tokio::signal::ctrl_c() => LifecycleSignal::Terminate,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> LifecycleSignal {
        let _ = tokio::signal::ctrl_c().await;
        LifecycleSignal::Terminate
    }
}
