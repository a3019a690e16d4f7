//! Trellis daemon.
//!
//! Application objects are registered with a [`dispatch::Namespace`] under
//! one of five handler shapes (function, service, singleton, token,
//! collection). The namespace routes transport requests onto them and
//! renders whatever they return as hypermedia, so clients can navigate the
//! tree from its root without knowing any URL in advance.
//!
//! Collections are backed by a [`store::Store`]; [`store::MemoryStore`] is
//! the in-process reference backend. The daemon serves a namespace over a
//! TCP or Unix socket, one JSON-framed request per connection, and ships a
//! small [`demo`] namespace for the `trellisd` binary.

mod bootstrap;
pub mod demo;
pub mod dispatch;
pub mod store;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
    serve,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ListenerError, MAX_REQUEST_BYTES};
