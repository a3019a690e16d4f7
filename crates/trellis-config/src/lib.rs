//! Shared configuration for the Trellis daemon and client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `TRELLIS_CONFIG_PATH`), then `TRELLIS_*`
//! environment variables, then command-line flags.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TCP_PORT, DEFAULT_URL_PREFIX, default_log_filter, default_log_format,
    default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Command-line flags understood by [`Config::load_from_iter`].
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--listen-socket",
    "--url-prefix",
    "--log-filter",
    "--log-format",
    "--page-size",
    "--poll-interval-ms",
    "--max-poll-attempts",
];

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TRELLIS")]
pub struct Config {
    /// Endpoint the daemon binds and the client dials.
    #[ortho_config(default = defaults::default_socket_endpoint())]
    pub listen_socket: SocketEndpoint,
    /// Path under which the dispatch tree is mounted.
    #[ortho_config(default = defaults::DEFAULT_URL_PREFIX.to_owned())]
    pub url_prefix: String,
    /// `tracing` filter directive.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Items per listing page.
    #[ortho_config(default = defaults::DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
    /// Delay between waiter polls, in milliseconds.
    #[ortho_config(default = defaults::DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
    /// Polls a client makes before giving up on a waiter.
    #[ortho_config(default = defaults::DEFAULT_MAX_POLL_ATTEMPTS)]
    pub max_poll_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: defaults::default_socket_endpoint(),
            url_prefix: defaults::DEFAULT_URL_PREFIX.to_owned(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            page_size: defaults::DEFAULT_PAGE_SIZE,
            poll_interval_ms: defaults::DEFAULT_POLL_INTERVAL_MS,
            max_poll_attempts: defaults::DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl Config {
    /// Endpoint the daemon binds and the client dials.
    #[must_use]
    pub const fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Mount prefix, always starting and ending with `/`.
    #[must_use]
    pub fn url_prefix(&self) -> String {
        let trimmed = self.url_prefix.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_owned()
        } else {
            format!("/{trimmed}/")
        }
    }

    /// `tracing` filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Items per listing page; never zero.
    #[must_use]
    pub fn page_size(&self) -> usize {
        usize::try_from(self.page_size.max(1)).unwrap_or(usize::MAX)
    }

    /// Delay between waiter polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Polls a client makes before giving up on a waiter.
    #[must_use]
    pub const fn max_poll_attempts(&self) -> u32 {
        self.max_poll_attempts
    }
}
