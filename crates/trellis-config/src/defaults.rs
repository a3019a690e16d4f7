#[cfg(unix)]
use camino::Utf8PathBuf;
#[cfg(unix)]
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// TCP port used where Unix domain sockets are unavailable.
pub const DEFAULT_TCP_PORT: u16 = 9787;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default mount prefix.
pub const DEFAULT_URL_PREFIX: &str = "/";

/// Default number of items per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default delay between waiter polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default number of polls before a waiter is abandoned.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;

/// Default `tracing` filter directive.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default daemon endpoint.
///
/// On Unix this is `$XDG_RUNTIME_DIR/trellis/trellisd.sock`, falling back to a
/// per-user directory under the system temp dir. Elsewhere it is TCP loopback.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    platform_socket_endpoint()
}

#[cfg(unix)]
fn platform_socket_endpoint() -> SocketEndpoint {
    let mut base = match runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        Some(dir) => dir.join("trellis"),
        None => temp_base().join("trellis").join(user_namespace()),
    };
    base.push("trellisd.sock");
    SocketEndpoint::unix(base)
}

#[cfg(unix)]
fn temp_base() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn platform_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
