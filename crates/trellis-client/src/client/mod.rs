//! The client verb surface.
//!
//! Every verb accepts a [`Target`]: a raw URL, a prepared [`Request`], a
//! proxy from an earlier reply, or plain data. Verbs check that the target
//! fits before anything is sent and fail with
//! [`ClientError::MethodMismatch`] when it does not.

mod listing;

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use tracing::debug;
use trellis_config::Config;
use trellis_wire::{Method, Registry, Request, Selector, Tree, Value, codec};

pub use self::listing::Listing;
use crate::args::CallArgs;
use crate::errors::ClientError;
use crate::proxy::{
    Member, NEW_SEGMENT, Remote, RemoteDataset, RemoteFunction, RemoteList, RemoteObject,
    RemoteWaiter, Reply,
};
use crate::resolver::{RESOLVER_TARGET, decode_response};
use crate::transport::Transport;
use crate::urls::{self, append_segment};

/// Base that root-relative URLs are resolved against.
pub const DEFAULT_BASE: &str = "http://trellis.invalid/";

/// What a verb acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A URL, absolute or root-relative.
    Url(String),
    /// A request sent as given.
    Action(Request),
    /// A proxy from an earlier reply.
    Remote(Remote),
    /// Plain data from an earlier reply.
    Data(Value),
}

impl Target {
    fn describe(&self) -> String {
        match self {
            Self::Url(url) => format!("url {url}"),
            Self::Action(request) => format!("{} {}", request.method, request.url),
            Self::Remote(remote) => remote.to_string(),
            Self::Data(value) => format!("{} value", value.kind_name()),
        }
    }
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Self::Url(url.to_owned())
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Request> for Target {
    fn from(request: Request) -> Self {
        Self::Action(request)
    }
}

impl From<Remote> for Target {
    fn from(remote: Remote) -> Self {
        Self::Remote(remote)
    }
}

impl From<Reply> for Target {
    fn from(reply: Reply) -> Self {
        match reply {
            Tree::Object(remote) => Self::Remote(remote),
            Tree::Data(value) => Self::Data(value),
            nested @ (Tree::Seq(_) | Tree::Set(_) | Tree::Map(_)) => {
                Self::Data(nested.render(&Unresolved).unwrap_or(Value::Null))
            }
        }
    }
}

macro_rules! remote_targets {
    ($($variant:ident($proxy:ty)),* $(,)?) => {
        $(
            impl From<$proxy> for Target {
                fn from(proxy: $proxy) -> Self {
                    Self::Remote(Remote::$variant(proxy))
                }
            }
        )*
    };
}

remote_targets!(
    Function(RemoteFunction),
    Object(RemoteObject),
    Dataset(RemoteDataset),
    List(RemoteList),
    Waiter(RemoteWaiter),
);

/// Renders nested proxies as their URLs when a reply is used as data.
struct Unresolved;

impl trellis_wire::Substitute<Remote> for Unresolved {
    type Error = trellis_wire::CodecError;

    fn substitute(&self, remote: &Remote) -> Result<Value, Self::Error> {
        Ok(Value::from(remote.url()))
    }
}

/// Polling discipline for [`Client::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay before each poll.
    pub interval: Duration,
    /// Polls allowed before giving up.
    pub max_attempts: u32,
}

impl WaitPolicy {
    /// Polls every `interval`, at most `max_attempts` times.
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Policy from the configured poll interval and attempt cap.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.poll_interval(), config.max_poll_attempts())
    }
}

/// Listing parameters for [`Client::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Selector passed directly; conflicts with builder predicates.
    pub selector: Option<Selector>,
    /// Page size; the server's choice when absent.
    pub batch: Option<usize>,
}

impl ListOptions {
    /// Pages of the configured size, no direct selector.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            selector: None,
            batch: Some(config.page_size()),
        }
    }

    /// Sets the direct selector.
    #[must_use]
    pub fn selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn batch(mut self, batch: usize) -> Self {
        self.batch = Some(batch);
        self
    }
}

/// Synchronous client over a [`Transport`].
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    registry: Registry,
    base: String,
}

impl<T: Transport> Client<T> {
    /// Client decoding the hypermedia vocabulary, resolving against
    /// [`DEFAULT_BASE`].
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            registry: Registry::hypermedia(),
            base: DEFAULT_BASE.to_owned(),
        }
    }

    /// Replaces the registry, for applications with their own tags.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the base URL.
    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request` as given and decodes the reply.
    ///
    /// # Errors
    ///
    /// Returns the transport, codec or remote failure.
    pub fn fetch(&self, request: &Request) -> Result<Reply, ClientError> {
        let base = urls::parse_base(&self.base)?;
        let request_url = base.join(&request.url).map_err(|source| ClientError::Url {
            url: request.url.clone(),
            source,
        })?;
        let response = self.transport.exchange(request)?;
        debug!(
            target: RESOLVER_TARGET,
            method = %request.method,
            url = request.url.as_str(),
            status = response.status,
            "exchanged request"
        );
        decode_response(&self.registry, request_url, &response)
    }

    /// GET of a URL or proxy. Listings are read with [`Client::list`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] for listings, data and
    /// non-GET actions, else the fetch failure.
    pub fn get(&self, target: impl Into<Target>) -> Result<Reply, ClientError> {
        let request = match target.into() {
            Target::Url(url) => Request::new(Method::Get, url),
            Target::Action(request) if request.method == Method::Get => request,
            Target::Remote(remote) if !matches!(remote, Remote::List(_)) => {
                Request::new(Method::Get, remote.url())
            }
            other => return Err(ClientError::mismatch("get", other.describe())),
        };
        self.fetch(&request)
    }

    /// POST of a raw body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] unless the target is a URL, a
    /// POST action or a POST function.
    pub fn post(&self, target: impl Into<Target>, body: &Value) -> Result<Reply, ClientError> {
        let url = match target.into() {
            Target::Url(url) => url,
            Target::Action(request) if request.method == Method::Post => request.url,
            Target::Remote(Remote::Function(function)) if function.method() == Method::Post => {
                function.url().to_owned()
            }
            other => return Err(ClientError::mismatch("post", other.describe())),
        };
        self.fetch(&Request::new(Method::Post, url).with_body(codec::to_text(body)?))
    }

    /// Invokes a function with arguments.
    ///
    /// A URL target is POSTed the named arguments; positional arguments need
    /// a declared function.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] for targets that are not
    /// callable, [`ClientError::InvalidArgument`] when arguments do not
    /// bind, else the fetch failure.
    pub fn call(&self, target: impl Into<Target>, args: &CallArgs) -> Result<Reply, ClientError> {
        let request = match target.into() {
            Target::Remote(Remote::Function(function)) => function.action(args)?,
            Target::Url(url) => {
                let bound = args.bind(&[], &BTreeMap::new())?;
                Request::new(Method::Post, url).with_body(codec::to_text(&Value::Map(bound))?)
            }
            other => return Err(ClientError::mismatch("call", other.describe())),
        };
        self.fetch(&request)
    }

    /// Invokes a named link or method of a remote object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AttributeNotFound`] for unknown names,
    /// [`ClientError::MethodMismatch`] for attributes, else the call failure.
    pub fn call_method(
        &self,
        object: &RemoteObject,
        name: &str,
        args: &CallArgs,
    ) -> Result<Reply, ClientError> {
        match object.member(name)? {
            Member::Link(function) | Member::Method(function) => self.call(function, args),
            Member::Attribute(_) => Err(ClientError::mismatch(
                "call_method",
                format!("attribute {name} of {} object {}", object.kind(), object.url()),
            )),
        }
    }

    /// Creates a record in a collection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] unless the target is a dataset
    /// or a collection URL.
    pub fn create(&self, target: impl Into<Target>, args: &CallArgs) -> Result<Reply, ClientError> {
        let request = match target.into() {
            Target::Remote(Remote::Dataset(dataset)) => dataset.create_action(args)?,
            Target::Url(url) => {
                let bound = args.bind(&[], &BTreeMap::new())?;
                Request::new(Method::Post, append_segment(&url, NEW_SEGMENT))
                    .with_body(codec::to_text(&Value::Map(bound))?)
            }
            other => return Err(ClientError::mismatch("create", other.describe())),
        };
        self.fetch(&request)
    }

    /// Replacing a resource in place is not part of the protocol.
    ///
    /// # Errors
    ///
    /// Always returns [`ClientError::Unimplemented`].
    #[expect(clippy::unused_self, reason = "kept alongside the other verbs")]
    pub fn update(&self, _target: impl Into<Target>, _args: &CallArgs) -> Result<Reply, ClientError> {
        Err(ClientError::Unimplemented { verb: "update" })
    }

    /// Fetches one record of a dataset by key.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] unless the target is a
    /// dataset.
    pub fn lookup(&self, target: impl Into<Target>, key: &str) -> Result<Reply, ClientError> {
        match target.into() {
            Target::Remote(Remote::Dataset(dataset)) => self.fetch(&dataset.lookup_action(key)),
            other => Err(ClientError::mismatch("lookup", other.describe())),
        }
    }

    /// Deletes a record, or whatever a URL or DELETE action addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] for objects outside a
    /// collection and for other proxies.
    pub fn delete(&self, target: impl Into<Target>) -> Result<Reply, ClientError> {
        let request = match target.into() {
            Target::Url(url) => Request::new(Method::Delete, url),
            Target::Action(request) if request.method == Method::Delete => request,
            Target::Remote(Remote::Object(object)) => object.delete_action()?,
            other => return Err(ClientError::mismatch("delete", other.describe())),
        };
        self.fetch(&request)
    }

    /// Deletes every record matching the dataset's predicates or `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when predicates come from
    /// both places, [`ClientError::MethodMismatch`] for non-datasets.
    pub fn delete_list(
        &self,
        target: impl Into<Target>,
        selector: Option<Selector>,
    ) -> Result<Reply, ClientError> {
        match target.into() {
            Target::Remote(Remote::Dataset(dataset)) => {
                self.fetch(&dataset.delete_list_action(selector)?)
            }
            other => Err(ClientError::mismatch("delete_list", other.describe())),
        }
    }

    /// Lazily lists a dataset, or continues from an earlier page.
    ///
    /// The first page is fetched now; later pages are fetched as iteration
    /// reaches the end of the current one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] for other targets,
    /// [`ClientError::InvalidArgument`] for conflicting selectors, else the
    /// first page's fetch failure.
    pub fn list(
        &self,
        target: impl Into<Target>,
        options: ListOptions,
    ) -> Result<Listing<'_, T>, ClientError> {
        match target.into() {
            Target::Remote(Remote::Dataset(dataset)) => {
                let request = dataset.list_action(options.selector, options.batch)?;
                Listing::start(self, &request, options.batch)
            }
            Target::Remote(Remote::List(page)) => {
                if options.selector.is_some() {
                    return Err(ClientError::invalid_argument(
                        "a continued listing keeps its original selector",
                    ));
                }
                Ok(Listing::resume(self, page, options.batch))
            }
            other => Err(ClientError::mismatch("list", other.describe())),
        }
    }

    pub(crate) fn fetch_page(&self, request: &Request) -> Result<RemoteList, ClientError> {
        match self.fetch(request)? {
            Tree::Object(Remote::List(page)) => Ok(page),
            other => Err(ClientError::UnexpectedReply {
                expected: "a listing",
                found: describe_reply(&other),
            }),
        }
    }

    /// Polls until the value is no longer a waiter.
    ///
    /// Non-waiter proxies and data are returned at once; URLs and actions
    /// are fetched first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WaitExhausted`] when the policy's attempts run
    /// out, else the first fetch failure.
    pub fn wait(&self, target: impl Into<Target>, policy: &WaitPolicy) -> Result<Reply, ClientError> {
        let mut current = match target.into() {
            Target::Url(url) => self.fetch(&Request::new(Method::Get, url))?,
            Target::Action(request) => self.fetch(&request)?,
            Target::Remote(remote) => Tree::Object(remote),
            Target::Data(value) => Tree::Data(value),
        };
        for attempt in 1..=policy.max_attempts {
            let Tree::Object(Remote::Waiter(waiter)) = &current else {
                return Ok(current);
            };
            let poll = waiter.poll_action();
            thread::sleep(policy.interval);
            debug!(target: RESOLVER_TARGET, attempt, url = poll.url.as_str(), "polling waiter");
            current = self.fetch(&poll)?;
        }
        if matches!(current, Tree::Object(Remote::Waiter(_))) {
            return Err(ClientError::WaitExhausted {
                attempts: policy.max_attempts,
            });
        }
        Ok(current)
    }

    /// Change notification is not part of the protocol.
    ///
    /// # Errors
    ///
    /// Always returns [`ClientError::Unimplemented`].
    #[expect(clippy::unused_self, reason = "kept alongside the other verbs")]
    pub fn watch(&self, _target: impl Into<Target>) -> Result<Reply, ClientError> {
        Err(ClientError::Unimplemented { verb: "watch" })
    }
}

fn describe_reply(reply: &Reply) -> String {
    match reply {
        Tree::Object(remote) => remote.to_string(),
        Tree::Data(value) => format!("{} value", value.kind_name()),
        Tree::Seq(_) => "a sequence".to_owned(),
        Tree::Set(_) => "a set".to_owned(),
        Tree::Map(_) => "a mapping".to_owned(),
    }
}

#[cfg(test)]
mod tests;
