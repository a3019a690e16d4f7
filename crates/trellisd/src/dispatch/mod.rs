//! The dispatch tree.
//!
//! A [`Namespace`] maps the first path segment of each request onto a
//! [`Handler`]. Handlers come in five shapes, one per kind of application
//! object, and all share one URL/verb surface:
//!
//! ```text
//! /<name>                         handler root
//! /<name>/<method>                method of a service, singleton or token
//! /<name>/<method>/wait           poll of a waiting method
//! /<name>/id/<key>[/<method>]     collection record
//! /<name>/list | new | delete     collection operations
//! ```
//!
//! Replies are [`Reply`] trees: plain data interleaved with runtime objects
//! that the namespace embeds as hypermedia when rendering.

mod context;
mod errors;
mod handlers;
mod interface;
mod namespace;
mod object;
mod query;

pub use self::context::{Context, Frame, SubRequest};
pub use self::errors::{DispatchError, RegistrationError};
pub use self::handlers::{
    Bind, CollectionHandler, Exposed, Function, FunctionHandler, Handler, ServiceHandler,
    SingletonHandler, Token, TokenHandler, WAIT_SEGMENT,
};
pub use self::interface::{Args, Interface, Param, Params, Signature, is_private};
pub use self::namespace::{INDEX_KIND, Namespace};
pub use self::object::{Instance, Object, Pending, Reply};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
