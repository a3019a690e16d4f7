//! Daemon bootstrap: configuration, telemetry, namespace, listener.

use std::net::SocketAddr;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::info;
use trellis_config::{Config, SocketPreparationError};

use crate::dispatch::{Namespace, RegistrationError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, NamespaceConnectionHandler, SocketListener};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no configuration can be resolved.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader(pub Config);

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.0.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The namespace could not be built.
    #[error("failed to build namespace: {source}")]
    Registration {
        /// Offending declaration.
        #[source]
        source: RegistrationError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The listener could not be bound or stopped cleanly.
    #[error("socket listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

/// A namespace being served on a socket.
#[derive(Debug)]
pub struct Daemon {
    config: Config,
    local_addr: Option<SocketAddr>,
    listener: ListenerHandle,
    telemetry: Option<TelemetryHandle>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Bound TCP address; `None` when serving a Unix socket.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Telemetry handle, present when the daemon installed telemetry.
    #[must_use]
    pub const fn telemetry(&self) -> Option<TelemetryHandle> {
        self.telemetry
    }

    /// Asks the accept loop to stop; in-flight connections finish.
    pub fn shutdown(&self) {
        self.listener.shutdown();
    }

    /// Blocks until the accept loop exits.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when the accept thread panicked.
    pub fn join(self) -> Result<(), BootstrapError> {
        self.listener
            .join()
            .map_err(|source| BootstrapError::Listener { source })
    }
}

/// Serves `namespace` on the configured endpoint without touching telemetry.
///
/// # Errors
///
/// Returns [`BootstrapError::Socket`] or [`BootstrapError::Listener`] when
/// the endpoint cannot be prepared or bound.
pub fn serve(config: Config, namespace: Arc<Namespace>) -> Result<Daemon, BootstrapError> {
    let endpoint = config.listen_socket();
    endpoint
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;
    let listener =
        SocketListener::bind(endpoint).map_err(|source| BootstrapError::Listener { source })?;
    let local_addr = listener.local_addr();
    let handler = Arc::new(NamespaceConnectionHandler::new(namespace));
    let handle = listener
        .start(handler)
        .map_err(|source| BootstrapError::Listener { source })?;
    info!(target: BOOTSTRAP_TARGET, endpoint = %endpoint, "daemon serving");
    Ok(Daemon {
        config,
        local_addr,
        listener: handle,
        telemetry: None,
    })
}

/// Loads configuration, installs telemetry, builds the namespace and serves
/// it.
///
/// # Errors
///
/// Returns the [`BootstrapError`] for the first stage that failed.
pub fn bootstrap_with<B>(loader: &dyn ConfigLoader, build: B) -> Result<Daemon, BootstrapError>
where
    B: FnOnce(&Config) -> Result<Namespace, RegistrationError>,
{
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let namespace = build(&config).map_err(|source| BootstrapError::Registration { source })?;
    info!(
        target: BOOTSTRAP_TARGET,
        prefix = namespace.prefix(),
        handlers = namespace.index().len(),
        "namespace built"
    );
    let mut daemon = serve(config, Arc::new(namespace))?;
    daemon.telemetry = Some(telemetry);
    Ok(daemon)
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use trellis_config::SocketEndpoint;

    use super::*;
    use crate::demo;

    #[fixture]
    fn tcp_config() -> Config {
        Config {
            listen_socket: SocketEndpoint::tcp("127.0.0.1", 0),
            ..Config::default()
        }
    }

    #[rstest]
    fn bootstrap_serves_on_an_ephemeral_port(tcp_config: Config) {
        let daemon = bootstrap_with(&StaticConfigLoader(tcp_config), demo::namespace)
            .expect("bootstrap");
        assert!(daemon.local_addr().is_some_and(|addr| addr.port() != 0));
        assert!(daemon.telemetry().is_some());
        daemon.shutdown();
        daemon.join().expect("join");
    }

    #[rstest]
    fn registration_failures_stop_bootstrap(tcp_config: Config) {
        let error = bootstrap_with(&StaticConfigLoader(tcp_config), |_| {
            Err(RegistrationError::PrivateName {
                name: "_x".to_owned(),
            })
        })
        .expect_err("registration should fail");
        assert!(matches!(error, BootstrapError::Registration { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn unpreparable_socket_directories_are_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").expect("write blocker");
        let socket = blocker.join("trellisd.sock");
        let config = Config {
            listen_socket: SocketEndpoint::unix(socket.to_str().expect("utf8 path")),
            ..Config::default()
        };
        let namespace = demo::namespace(&config).expect("namespace");

        let error = serve(config, Arc::new(namespace)).expect_err("directory creation fails");
        assert!(matches!(error, BootstrapError::Socket { .. }));
    }
}
