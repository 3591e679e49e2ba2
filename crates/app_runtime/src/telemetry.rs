//! Tracing initialisation
//!
//! `RUST_LOG` wins over the configured level when it is set. The subscriber
//! is installed once per process; later calls are no-ops.

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogSettings;
use crate::error::RuntimeError;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Builds the filter from `RUST_LOG`, falling back to `settings.level`
pub fn env_filter(settings: &LogSettings) -> Result<EnvFilter, RuntimeError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| RuntimeError::Telemetry(format!("log level '{}': {}", settings.level, e)))
}

/// Installs the global tracing subscriber
///
/// # Errors
///
/// Returns `RuntimeError::Telemetry` if the level directive does not parse
/// or another subscriber was installed outside this function.
pub fn init_tracing(settings: &LogSettings) -> Result<(), RuntimeError> {
    INSTALLED
        .get_or_try_init(|| {
            let registry = tracing_subscriber::registry().with(env_filter(settings)?);
            let installed = if settings.json {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_target(true))
                    .try_init()
            } else {
                registry
                    .with(tracing_subscriber::fmt::layer().with_target(true))
                    .try_init()
            };
            installed.map_err(|e| RuntimeError::Telemetry(e.to_string()))
        })
        .map(|_| ())
}
