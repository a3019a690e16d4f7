//! Failures of the socket listener serving a namespace.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Why the daemon could not start or keep serving its socket.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Host lookup for the TCP endpoint failed.
    #[error("cannot resolve {host}:{port}: {source}")]
    Resolve {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
        /// Lookup error.
        #[source]
        source: io::Error,
    },
    /// Host lookup succeeded with no addresses.
    #[error("{host}:{port} resolved to no addresses")]
    ResolveEmpty {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
    },
    /// The TCP address is taken or not ours to use.
    #[error("cannot listen on {addr}: {source}")]
    BindTcp {
        /// First resolved address.
        addr: SocketAddr,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The accept loop needs a non-blocking socket.
    #[error("cannot make the listener non-blocking: {source}")]
    NonBlocking {
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// This platform has no Unix domain sockets.
    #[cfg(not(unix))]
    #[error("endpoint {endpoint} needs unix sockets, which this platform lacks")]
    UnsupportedUnix {
        /// Endpoint path.
        endpoint: String,
    },
    /// The socket path could not be bound.
    #[cfg(unix)]
    #[error("cannot listen on {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// A live daemon already answers on the path.
    #[cfg(unix)]
    #[error("{path} is served by another process")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// The path exists and holds something other than a socket.
    #[cfg(unix)]
    #[error("{path} exists and is not a socket")]
    UnixNotSocket {
        /// Occupied path.
        path: String,
    },
    /// The existing path could not be inspected.
    #[cfg(unix)]
    #[error("cannot inspect {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// Probing the old socket failed with something other than a refusal.
    #[cfg(unix)]
    #[error("cannot probe {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: String,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The stale socket file would not go away.
    #[cfg(unix)]
    #[error("cannot remove stale socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The accept thread died.
    #[error("accept thread panicked")]
    ThreadPanic,
}
