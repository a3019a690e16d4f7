//! Handler nodes of the dispatch tree.
//!
//! Each variant maps one shape of application object onto the uniform
//! URL/verb surface and knows how to embed instances of that shape as
//! hypermedia:
//!
//! - [`FunctionHandler`]: a single callable;
//! - [`ServiceHandler`]: a stateless namespace of methods;
//! - [`SingletonHandler`]: one instance living as long as the process;
//! - [`TokenHandler`]: an instance rebuilt from query parameters per request;
//! - [`CollectionHandler`]: keyed records held by a [`Store`](crate::store::Store).

mod collection;
mod function;
mod service;
mod singleton;
mod token;

use std::any::TypeId;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use trellis_wire::hypermedia::{Resource, Waiter};
use trellis_wire::{Hyperlink, Method, Tree, Value};

pub use self::collection::CollectionHandler;
pub use self::function::{Function, FunctionHandler};
pub use self::service::ServiceHandler;
pub use self::singleton::SingletonHandler;
pub use self::token::{Token, TokenHandler};

use super::context::{Context, SubRequest};
use super::errors::{DispatchError, RegistrationError};
use super::interface::{Args, Interface, Signature};
use super::object::{Instance, Object, Reply};
use super::query;

/// Path segment under which waiting endpoints are polled.
pub const WAIT_SEGMENT: &str = "wait";

/// A node mounted at a fixed URL.
pub trait Handler: Send + Sync {
    /// URL the node is mounted at.
    fn url(&self) -> &str;

    /// Runtime types whose instances this node embeds.
    fn embeds(&self) -> Vec<TypeId>;

    /// Type-level descriptor listed in the namespace index.
    fn describe(&self) -> Hyperlink;

    /// Embeds an instance of one of the types reported by [`Handler::embeds`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] when the instance has another type.
    fn embed(&self, instance: &Instance) -> Result<Hyperlink, DispatchError>;

    /// Answers a request de-scoped to this node.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] terminating the request.
    fn handle(&self, request: SubRequest, context: &mut Context<'_>)
    -> Result<Reply, DispatchError>;
}

/// Construction of a handler from its URL and the registered object.
pub trait Bind<O>: Handler + Sized {
    /// Builds the node once, at registration.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] when the object's declarations are
    /// invalid.
    fn bind(url: String, object: O) -> Result<Self, RegistrationError>;
}

/// An application type with declared methods and attributes.
pub trait Exposed: Send + Sync + Sized + 'static {
    /// Declares the type's kind and methods. Called once per registration.
    fn interface() -> Interface;

    /// Current attribute values. Private names are dropped when embedding.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the values cannot be read.
    fn attributes(&self) -> Result<BTreeMap<String, Value>, DispatchError> {
        Ok(BTreeMap::new())
    }

    /// Invokes a declared method.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] reported to the caller.
    fn call(&self, method: &str, args: Args, context: &Context<'_>)
    -> Result<Reply, DispatchError>;

    /// Readiness step of a waiting method, called on every poll with the
    /// state of the previous [`Pending`](super::Pending).
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] reported to the caller.
    fn resume(
        &self,
        method: &str,
        _state: Args,
        _context: &Context<'_>,
    ) -> Result<Reply, DispatchError> {
        Err(DispatchError::not_implemented(format!("{method}/{WAIT_SEGMENT}")))
    }
}

/// A callable URL: the shared GET/POST/`wait` state machine of functions
/// and methods.
pub(crate) struct Endpoint<'a> {
    path: String,
    query: &'a [(String, String)],
    signature: &'a Signature,
}

impl<'a> Endpoint<'a> {
    pub(crate) const fn new(
        path: String,
        query: &'a [(String, String)],
        signature: &'a Signature,
    ) -> Self {
        Self {
            path,
            query,
            signature,
        }
    }

    fn url(&self) -> String {
        query::with_query(&self.path, self.query)
    }

    /// Routes `request`, whose path is relative to the endpoint.
    ///
    /// GET invokes safe signatures and describes the others; POST invokes
    /// with the bound body; `wait` polls the readiness step with the query
    /// parameters that do not address the enclosing instance.
    pub(crate) fn dispatch(
        &self,
        request: SubRequest,
        call: impl FnOnce(Args) -> Result<Reply, DispatchError>,
        resume: impl FnOnce(Args) -> Result<Reply, DispatchError>,
    ) -> Result<Reply, DispatchError> {
        let reply = match (request.path.as_slice(), request.method) {
            ([], Method::Get) if self.signature.is_safe() && request.body.is_none() => {
                call(Args::new())?
            }
            ([], Method::Get) => return Ok(Object::hyperlink(self.signature.hyperlink(&self.url()))),
            ([], Method::Post) => call(Args::bind(self.signature.params(), request.body)?)?,
            ([], method) => return Err(DispatchError::method_not_allowed(method, self.path.as_str())),
            ([wait], Method::Get) if wait == WAIT_SEGMENT && self.signature.waits() => {
                resume(self.state(&request))?
            }
            ([wait], method) if wait == WAIT_SEGMENT && self.signature.waits() => {
                return Err(DispatchError::method_not_allowed(
                    method,
                    format!("{}/{WAIT_SEGMENT}", self.path),
                ));
            }
            _ => {
                return Err(DispatchError::not_found(format!(
                    "{}/{}",
                    self.path,
                    request.path_text()
                )));
            }
        };
        self.settle(reply)
    }

    fn state(&self, request: &SubRequest) -> Args {
        let values = request
            .public_params()
            .filter(|(name, _)| self.query.iter().all(|(own, _)| own != name))
            .map(|(name, text)| (name.to_owned(), query::decode_value(text)))
            .collect();
        Args::from_values(values)
    }

    /// Turns a top-level pending result into a waiter polled under `wait`.
    fn settle(&self, reply: Reply) -> Result<Reply, DispatchError> {
        match reply {
            Tree::Object(Object::Pending(pending)) if self.signature.waits() => {
                let mut pairs = self.query.to_vec();
                pairs.extend(query::encode_state(pending.state())?);
                let url = query::with_query(&format!("{}/{WAIT_SEGMENT}", self.path), &pairs);
                Ok(Object::hyperlink(Hyperlink::Waiter(Waiter { url })))
            }
            Tree::Object(Object::Pending(_)) => Err(DispatchError::internal(format!(
                "'{}' returned a pending result but is not declared as waiting",
                self.path
            ))),
            other => Ok(other),
        }
    }
}

/// Method nodes of an [`Exposed`] type, built once from its interface.
pub(crate) struct MethodTable<T> {
    interface: Interface,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Exposed> MethodTable<T> {
    pub(crate) fn declare() -> Result<Self, RegistrationError> {
        let interface = T::interface();
        interface.validate()?;
        Ok(Self {
            interface,
            _marker: PhantomData,
        })
    }

    pub(crate) const fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Embeds `target` as a resource at `url`.
    pub(crate) fn resource(&self, target: &T, url: String) -> Result<Resource, DispatchError> {
        let members = self.interface.members(target.attributes()?)?;
        Ok(Resource::new(self.interface.kind(), url, members))
    }

    /// Invokes the member named by the head of `request` on the innermost
    /// enclosing instance.
    pub(crate) fn invoke(
        &self,
        request: SubRequest,
        context: &mut Context<'_>,
    ) -> Result<Reply, DispatchError> {
        let (head, rest) = request.descend();
        let Some(name) = head else {
            return Err(DispatchError::internal("member invoked without a name"));
        };
        let shared: &Context<'_> = context;
        let (frame, target) = shared.innermost_as::<T>()?;
        let signature = self
            .interface
            .signature(&name)
            .ok_or_else(|| DispatchError::not_found(frame.member_url(&name)))?;

        let endpoint = Endpoint::new(format!("{}/{name}", frame.path()), frame.query(), signature);
        endpoint.dispatch(
            rest,
            |args| target.call(&name, args, shared),
            |state| target.resume(&name, state, shared),
        )
    }
}

/// Rejects `instance` unless it holds a `T`.
pub(crate) fn expect_instance<T: Exposed>(
    instance: &Instance,
) -> Result<&T, DispatchError> {
    instance.downcast_ref::<T>().ok_or_else(|| {
        DispatchError::internal(format!(
            "cannot embed {} as {}",
            instance.type_name(),
            std::any::type_name::<T>()
        ))
    })
}
