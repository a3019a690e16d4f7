//! Socket transport for the daemon.
//!
//! The listener binds a configured [`SocketEndpoint`](trellis_config::SocketEndpoint),
//! accepts connections on a background thread and hands each one to a
//! [`ConnectionHandler`]. The namespace handler reads one JSONL request and
//! writes one JSONL response per connection.

mod errors;
mod handler;
mod listener;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream, NamespaceConnectionHandler};
pub use self::handler::MAX_REQUEST_BYTES;
pub(crate) use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
