//! Structured logging initialization.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::settings::{LogFormat, LoggingSettings};

/// Default filter when neither `RUST_LOG` nor the settings give a usable one.
const FALLBACK_FILTER: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so that
/// stdout stays free for audit output and command results.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    match settings.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
}
