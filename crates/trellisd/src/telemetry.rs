//! Process-wide tracing for the daemon.
//!
//! Events go to stderr, filtered by `log_filter` and rendered in the
//! configured [`LogFormat`]. The subscriber is installed once per process.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};
use trellis_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

type EventLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Proof that daemon tracing is active.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Tracing could not be installed.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid directive list.
    #[error("log filter rejected: {0}")]
    Filter(String),
    /// Some other subscriber owns the process.
    #[error("cannot install the tracing subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs tracing for the process; repeated calls are no-ops that
/// ignore their configuration.
///
/// ```rust
/// use trellis_config::Config;
/// use trellisd::telemetry;
///
/// # fn main() -> Result<(), trellisd::TelemetryError> {
/// let config = Config::default();
/// telemetry::initialise(&config)?;
/// telemetry::initialise(&config)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails when the filter is malformed or another subscriber is installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED.get_or_try_init(|| install(config))?;
    Ok(TelemetryHandle)
}

fn install(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let subscriber = tracing_subscriber::registry()
        .with(event_layer(config.log_format()))
        .with(filter);
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn event_layer(format: LogFormat) -> EventLayer {
    let base = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);
    match format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filters_are_reported() {
        let config = Config {
            log_filter: "trellisd=loud".to_owned(),
            ..Config::default()
        };
        let error = install(&config).expect_err("filter should not parse");
        assert!(matches!(error, TelemetryError::Filter(_)));
    }
}
