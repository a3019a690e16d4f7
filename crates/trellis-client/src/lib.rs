//! Trellis client.
//!
//! The client starts from a URL, usually the namespace root, and follows the
//! hypermedia in each reply. Every `Link`, `Form`, `Resource`, `Service`,
//! `Dataset`, `List` and `Waiter` in a body is resolved into a [`Remote`]
//! proxy whose URLs are already absolute with respect to the request that
//! produced it, so callers never assemble paths by hand:
//!
//! ```no_run
//! use trellis_client::{CallArgs, Client, ListOptions, Remote, SocketTransport};
//! use trellis_config::Config;
//!
//! # fn main() -> Result<(), trellis_client::ClientError> {
//! let config = Config::default();
//! let client = Client::new(SocketTransport::from_config(&config));
//! let root = client.get("/")?;
//! let Some(Remote::Object(index)) = root.into_object() else {
//!     return Ok(());
//! };
//! if let Some(jobs) = index.attribute("jobs").cloned() {
//!     for job in client.list(jobs, ListOptions::from_config(&config))? {
//!         let _record = job?;
//!     }
//! }
//! client.call("/echo", &CallArgs::new().named("value", "hi"))?;
//! # Ok(())
//! # }
//! ```
//!
//! Proxies only build requests; [`Client`] verbs send them over a
//! [`Transport`] and check up front that the verb suits the target.

mod args;
mod client;
mod errors;
mod proxy;
mod resolver;
mod transport;
mod urls;

pub use self::args::CallArgs;
pub use self::client::{Client, DEFAULT_BASE, ListOptions, Listing, Target, WaitPolicy};
pub use self::errors::{ClientError, TransportError};
pub use self::proxy::{
    Member, Remote, RemoteDataset, RemoteFunction, RemoteList, RemoteObject, RemoteWaiter, Reply,
};
pub use self::transport::{CONNECTION_TIMEOUT, SocketTransport, Transport};
pub use self::urls::append_segment;
