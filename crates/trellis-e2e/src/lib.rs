//! End-to-end support for Trellis.
//!
//! The tests in this crate drive a real [`Namespace`] through the real
//! [`Client`], either in process over [`LocalTransport`] or across a socket
//! served by [`trellisd::serve`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use trellis_client::{Client, Transport, TransportError};
use trellis_config::Config;
use trellis_wire::{Request, Response};
use trellisd::demo;
use trellisd::dispatch::{Namespace, RegistrationError};

/// Transport handing each request straight to a namespace.
#[derive(Debug)]
pub struct LocalTransport {
    namespace: Arc<Namespace>,
    exchanges: AtomicUsize,
}

impl LocalTransport {
    /// Serves `namespace` in process.
    #[must_use]
    pub const fn new(namespace: Arc<Namespace>) -> Self {
        Self {
            namespace,
            exchanges: AtomicUsize::new(0),
        }
    }

    /// Requests answered so far.
    #[must_use]
    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::Relaxed)
    }
}

impl Transport for LocalTransport {
    fn exchange(&self, request: &Request) -> Result<Response, TransportError> {
        self.exchanges.fetch_add(1, Ordering::Relaxed);
        Ok(self.namespace.respond(request))
    }
}

/// A client over a fresh demonstration namespace.
///
/// # Errors
///
/// Returns the [`RegistrationError`] raised while building the namespace.
pub fn demo_client(config: &Config) -> Result<Client<LocalTransport>, RegistrationError> {
    let namespace = demo::namespace(config)?;
    Ok(Client::new(LocalTransport::new(Arc::new(namespace))))
}
