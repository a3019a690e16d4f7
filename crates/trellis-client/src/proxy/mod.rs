//! Remote proxies built from hypermedia replies.
//!
//! A proxy owns only the URLs and declarations needed to continue the
//! protocol. Proxies never talk to the network themselves: they build the
//! [`Request`] for the next step and the [`Client`](crate::Client) sends it.

use std::collections::BTreeMap;
use std::fmt;

use trellis_wire::{Clause, Method, Request, Selector, Tree, Value, codec, selector};

use crate::args::CallArgs;
use crate::errors::ClientError;
use crate::urls::append_segment;

/// A decoded reply: plain data with proxies wherever hypermedia appeared.
pub type Reply = Tree<Remote>;

pub(crate) const ID_SEGMENT: &str = "id";
pub(crate) const LIST_SEGMENT: &str = "list";
pub(crate) const NEW_SEGMENT: &str = "new";
pub(crate) const WHERE_PARAM: &str = "where";
pub(crate) const LIMIT_PARAM: &str = "limit";
pub(crate) const CONTINUE_PARAM: &str = "continue";

/// Any proxy the resolver can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Remote {
    /// From a `Link` or a `Form`.
    Function(RemoteFunction),
    /// From a `Resource` or a `Service`.
    Object(RemoteObject),
    /// From a `Dataset`.
    Dataset(RemoteDataset),
    /// From a `List`.
    List(RemoteList),
    /// From a `Waiter`.
    Waiter(RemoteWaiter),
}

impl Remote {
    /// URL the proxy addresses.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Function(function) => function.url(),
            Self::Object(object) => object.url(),
            Self::Dataset(dataset) => dataset.url(),
            Self::List(list) => list.collection(),
            Self::Waiter(waiter) => waiter.url(),
        }
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(function) => write!(f, "function {}", function.url),
            Self::Object(object) => write!(f, "{} object {}", object.kind, object.url),
            Self::Dataset(dataset) => write!(f, "{} dataset {}", dataset.kind, dataset.url),
            Self::List(list) => write!(f, "{} listing {}", list.kind, list.collection),
            Self::Waiter(waiter) => write!(f, "waiter {}", waiter.url),
        }
    }
}

/// A callable endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFunction {
    method: Method,
    url: String,
    arguments: Vec<String>,
    defaults: BTreeMap<String, Value>,
    cached: Option<Value>,
}

impl RemoteFunction {
    pub(crate) const fn link(url: String, cached: Option<Value>) -> Self {
        Self {
            method: Method::Get,
            url,
            arguments: Vec::new(),
            defaults: BTreeMap::new(),
            cached,
        }
    }

    pub(crate) const fn form(
        url: String,
        arguments: Vec<String>,
        defaults: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            method: Method::Post,
            url,
            arguments,
            defaults,
            cached: None,
        }
    }

    /// Verb used to invoke the function.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Invocation URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Declared argument names, in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Declared defaults.
    #[must_use]
    pub const fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    /// Value the server attached to a link, if any.
    #[must_use]
    pub const fn cached(&self) -> Option<&Value> {
        self.cached.as_ref()
    }

    /// Builds the invocation request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when arguments are passed to
    /// a GET link or do not bind.
    pub fn action(&self, args: &CallArgs) -> Result<Request, ClientError> {
        if self.method == Method::Get {
            if !args.is_empty() {
                return Err(ClientError::invalid_argument(format!(
                    "{} takes no arguments",
                    self.url
                )));
            }
            return Ok(Request::new(Method::Get, self.url.clone()));
        }
        let bound = args.bind(&self.arguments, &self.defaults)?;
        body_request(self.method, self.url.clone(), bound)
    }
}

fn body_request(
    method: Method,
    url: String,
    arguments: BTreeMap<String, Value>,
) -> Result<Request, ClientError> {
    let body = codec::to_text(&Value::Map(arguments))?;
    Ok(Request::new(method, url).with_body(body))
}

/// One member of a [`RemoteObject`].
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// Attribute value, already resolved.
    Attribute(Reply),
    /// Safe, zero-argument method reachable with GET.
    Link(RemoteFunction),
    /// Method invoked with POST.
    Method(RemoteFunction),
}

/// A record, singleton, token view or service instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObject {
    kind: String,
    url: String,
    links: Vec<String>,
    methods: BTreeMap<String, Vec<String>>,
    attributes: BTreeMap<String, Reply>,
    collection: Option<String>,
    key: Option<String>,
}

impl RemoteObject {
    pub(crate) const fn new(
        kind: String,
        url: String,
        links: Vec<String>,
        methods: BTreeMap<String, Vec<String>>,
        attributes: BTreeMap<String, Reply>,
    ) -> Self {
        Self {
            kind,
            url,
            links,
            methods,
            attributes,
            collection: None,
            key: None,
        }
    }

    pub(crate) fn with_collection(mut self, collection: Option<String>, key: Option<String>) -> Self {
        self.collection = collection;
        self.key = key;
        self
    }

    /// Declared kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Object URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Enclosing collection URL, for records.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Record key, for records.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Names of safe methods.
    #[must_use]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Other methods and their argument names.
    #[must_use]
    pub const fn methods(&self) -> &BTreeMap<String, Vec<String>> {
        &self.methods
    }

    /// Attribute values.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, Reply> {
        &self.attributes
    }

    /// Borrows one attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Reply> {
        self.attributes.get(name)
    }

    /// Looks up an attribute, link or method by name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AttributeNotFound`] for unknown names.
    pub fn member(&self, name: &str) -> Result<Member, ClientError> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(Member::Attribute(value.clone()));
        }
        if self.links.iter().any(|link| link == name) {
            return Ok(Member::Link(RemoteFunction::link(
                append_segment(&self.url, name),
                None,
            )));
        }
        self.methods
            .get(name)
            .map(|arguments| {
                Member::Method(RemoteFunction::form(
                    append_segment(&self.url, name),
                    arguments.clone(),
                    BTreeMap::new(),
                ))
            })
            .ok_or_else(|| ClientError::AttributeNotFound {
                kind: self.kind.clone(),
                name: name.to_owned(),
            })
    }

    /// Builds the request removing this record from its collection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MethodMismatch`] for objects outside a
    /// collection.
    pub fn delete_action(&self) -> Result<Request, ClientError> {
        if self.collection.is_none() {
            return Err(ClientError::mismatch("delete", format!("{} object {}", self.kind, self.url)));
        }
        Ok(Request::new(Method::Delete, self.url.clone()))
    }
}

/// A keyed collection, with predicates accumulated client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDataset {
    kind: String,
    url: String,
    create: Vec<String>,
    selectors: Vec<String>,
    key: Option<String>,
    selector: Option<Selector>,
}

impl RemoteDataset {
    pub(crate) const fn new(
        kind: String,
        url: String,
        create: Vec<String>,
        selectors: Vec<String>,
        key: Option<String>,
    ) -> Self {
        Self {
            kind,
            url,
            create,
            selectors,
            key,
            selector: None,
        }
    }

    /// Record kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Collection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Creation argument names.
    #[must_use]
    pub fn create_arguments(&self) -> &[String] {
        &self.create
    }

    /// Fields usable in selectors.
    #[must_use]
    pub fn selector_fields(&self) -> &[String] {
        &self.selectors
    }

    /// Name of the key field, when advertised.
    #[must_use]
    pub fn key_name(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Predicates accumulated so far.
    #[must_use]
    pub const fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    /// A new dataset additionally requiring `key == value`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when `key` is not
    /// selector-eligible.
    pub fn where_eq(&self, key: &str, value: impl Into<Value>) -> Result<Self, ClientError> {
        self.where_clause(Clause::equals(key, value)?)
    }

    /// A new dataset additionally requiring `key != value`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when `key` is not
    /// selector-eligible.
    pub fn where_not(&self, key: &str, value: impl Into<Value>) -> Result<Self, ClientError> {
        self.where_clause(Clause::not_equals(key, value)?)
    }

    /// A new dataset additionally requiring `clause`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when the clause key is not
    /// selector-eligible.
    pub fn where_clause(&self, clause: Clause) -> Result<Self, ClientError> {
        if !self.selectors.iter().any(|field| field == clause.key()) {
            return Err(ClientError::invalid_argument(format!(
                "'{}' is not a selector field of {}",
                clause.key(),
                self.kind
            )));
        }
        let mut next = self.clone();
        next.selector = Some(
            next.selector
                .take()
                .unwrap_or_default()
                .with(clause),
        );
        Ok(next)
    }

    fn record_url(&self, key: &str) -> String {
        append_segment(&append_segment(&self.url, ID_SEGMENT), key)
    }

    /// Selector for one request: builder predicates or `direct`, never both.
    fn effective(&self, direct: Option<Selector>) -> Result<Option<Selector>, ClientError> {
        match (&self.selector, direct) {
            (Some(_), Some(_)) => Err(ClientError::invalid_argument(
                "selector given both through where() and directly",
            )),
            (accumulated, passed) => Ok(passed.or_else(|| accumulated.clone())),
        }
    }

    /// GET of one record.
    #[must_use]
    pub fn lookup_action(&self, key: &str) -> Request {
        Request::new(Method::Get, self.record_url(key))
    }

    /// DELETE of one record.
    #[must_use]
    pub fn delete_action(&self, key: &str) -> Request {
        Request::new(Method::Delete, self.record_url(key))
    }

    /// POST creating a record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when the arguments do not
    /// bind to the creation arguments.
    pub fn create_action(&self, args: &CallArgs) -> Result<Request, ClientError> {
        let bound = args.bind(&self.create, &BTreeMap::new())?;
        body_request(Method::Post, append_segment(&self.url, NEW_SEGMENT), bound)
    }

    /// GET of the first listing page.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when a selector arrives both
    /// from the builder and directly.
    pub fn list_action(
        &self,
        direct: Option<Selector>,
        batch: Option<usize>,
    ) -> Result<Request, ClientError> {
        let selected = self.effective(direct)?;
        Ok(list_request(
            Method::Get,
            &self.url,
            &selector::dump(selected.as_ref()),
            batch,
            None,
        ))
    }

    /// DELETE of every record matching the selector; match-all when none.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when a selector arrives both
    /// from the builder and directly.
    pub fn delete_list_action(&self, direct: Option<Selector>) -> Result<Request, ClientError> {
        let selected = self.effective(direct)?;
        Ok(list_request(
            Method::Delete,
            &self.url,
            &selector::dump(selected.as_ref()),
            None,
            None,
        ))
    }
}

fn list_request(
    method: Method,
    collection: &str,
    selector_text: &str,
    batch: Option<usize>,
    continuation: Option<&str>,
) -> Request {
    let mut request = Request::new(method, append_segment(collection, LIST_SEGMENT))
        .with_param(WHERE_PARAM, selector_text);
    if let Some(limit) = batch {
        request = request.with_param(LIMIT_PARAM, limit.to_string());
    }
    if let Some(token) = continuation {
        request = request.with_param(CONTINUE_PARAM, token);
    }
    request
}

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteList {
    kind: String,
    collection: String,
    items: Vec<Reply>,
    selector: String,
    continuation: Option<String>,
}

impl RemoteList {
    pub(crate) const fn new(
        kind: String,
        collection: String,
        items: Vec<Reply>,
        selector: String,
        continuation: Option<String>,
    ) -> Self {
        Self {
            kind,
            collection,
            items,
            selector,
            continuation,
        }
    }

    /// Record kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Collection URL.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Items on this page.
    #[must_use]
    pub fn items(&self) -> &[Reply] {
        &self.items
    }

    /// Takes the items on this page.
    #[must_use]
    pub fn into_items(self) -> Vec<Reply> {
        self.items
    }

    /// Selector text the page was listed with.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Opaque continuation token; absent on the last page.
    #[must_use]
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// GET of the following page, or `None` when this page is the last.
    #[must_use]
    pub fn next_action(&self, batch: Option<usize>) -> Option<Request> {
        self.continuation.as_deref().map(|token| {
            list_request(
                Method::Get,
                &self.collection,
                &self.selector,
                batch,
                Some(token),
            )
        })
    }
}

/// A deferred result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteWaiter {
    url: String,
}

impl RemoteWaiter {
    pub(crate) const fn new(url: String) -> Self {
        Self { url }
    }

    /// Poll URL, carrying the remaining state in its query string.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET polling the waiter once.
    #[must_use]
    pub fn poll_action(&self) -> Request {
        Request::new(Method::Get, self.url.clone())
    }
}

#[cfg(test)]
mod tests;
