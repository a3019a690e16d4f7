//! Root of the dispatch tree.
//!
//! A [`Namespace`] owns the handler table and the codec registry. It turns a
//! transport [`Request`] into a [`SubRequest`] for the handler named by the
//! first path segment, then renders the handler's [`Reply`] back into wire
//! text, embedding every runtime object through the handler that owns its
//! type.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use percent_encoding::percent_decode_str;
use tracing::{debug, warn};
use trellis_wire::hypermedia::{Fault, Members, Resource};
use trellis_wire::{Hyperlink, Method, Registry, Request, Response, Substitute, Value, codec};
use url::Url;

use super::context::{Context, SubRequest};
use super::errors::{DispatchError, RegistrationError};
use super::handlers::{Bind, Handler};
use super::object::{Instance, Object, Reply};
use super::DISPATCH_TARGET;

/// Kind of the resource served at the namespace root.
pub const INDEX_KIND: &str = "Index";

const BASE_URL: &str = "http://trellis.invalid/";

type Upcast = Box<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// The handler table mounted under a URL prefix.
pub struct Namespace {
    prefix: String,
    registry: Registry,
    handlers: Vec<Box<dyn Handler>>,
    by_name: BTreeMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
    aliases: HashMap<TypeId, (usize, Upcast)>,
    index: BTreeMap<String, Hyperlink>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("prefix", &self.prefix)
            .field("handlers", &self.by_name.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Namespace {
    /// Creates an empty namespace under `prefix`, which is normalised to
    /// begin and end with `/`.
    #[must_use]
    pub fn new(prefix: &str, registry: Registry) -> Self {
        let trimmed = prefix.trim_matches('/');
        let normalised = if trimmed.is_empty() {
            "/".to_owned()
        } else {
            format!("/{trimmed}/")
        };
        Self {
            prefix: normalised,
            registry,
            handlers: Vec::new(),
            by_name: BTreeMap::new(),
            by_type: HashMap::new(),
            aliases: HashMap::new(),
            index: BTreeMap::new(),
        }
    }

    /// URL prefix every handler is mounted under.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Codec registry shared by every handler.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry, for binding application types before serving.
    pub const fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Mounts `object` under `name` through the handler variant `H`.
    ///
    /// Instances of every type `H` reports through [`Handler::embeds`] are
    /// embedded by the new handler unless an earlier one already claimed the
    /// type.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] for duplicate, private or malformed
    /// names and for invalid declarations.
    pub fn register<H, O>(&mut self, name: &str, object: O) -> Result<&mut Self, RegistrationError>
    where
        H: Bind<O> + 'static,
    {
        RegistrationError::check_name(name)?;
        if self.by_name.contains_key(name) {
            return Err(RegistrationError::DuplicateName {
                name: name.to_owned(),
            });
        }
        let handler = H::bind(format!("{}{name}", self.prefix), object)?;
        let slot = self.handlers.len();
        for type_id in handler.embeds() {
            self.by_type.entry(type_id).or_insert(slot);
        }
        self.index.insert(name.to_owned(), handler.describe());
        self.handlers.push(Box::new(handler));
        self.by_name.insert(name.to_owned(), slot);
        debug!(target: DISPATCH_TARGET, name, prefix = %self.prefix, "registered handler");
        Ok(self)
    }

    /// Lets the handler `name` embed instances of `T` by projecting them onto
    /// a type it owns.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::UnknownHandler`] when nothing is mounted
    /// under `name`.
    pub fn alias<T, F>(&mut self, name: &str, upcast: F) -> Result<&mut Self, RegistrationError>
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Instance + Send + Sync + 'static,
    {
        let slot = *self
            .by_name
            .get(name)
            .ok_or_else(|| RegistrationError::UnknownHandler {
                name: name.to_owned(),
            })?;
        let project: Upcast =
            Box::new(move |instance: &Instance| instance.downcast_ref::<T>().map(&upcast));
        self.aliases.insert(TypeId::of::<T>(), (slot, project));
        Ok(self)
    }

    /// Type-level descriptors of every mounted handler, keyed by name.
    #[must_use]
    pub const fn index(&self) -> &BTreeMap<String, Hyperlink> {
        &self.index
    }

    fn index_reply(&self) -> Result<Reply, DispatchError> {
        let attributes = self
            .index
            .iter()
            .map(|(name, link)| Ok((name.clone(), Value::Tagged(link.to_tagged(&self.registry)?))))
            .collect::<Result<BTreeMap<_, _>, DispatchError>>()?;
        let members = Members::new(Vec::new(), BTreeMap::new(), attributes)
            .map_err(|error| DispatchError::internal(error.to_string()))?;
        Ok(Object::hyperlink(Hyperlink::Resource(Resource::new(
            INDEX_KIND,
            self.prefix.as_str(),
            members,
        ))))
    }

    /// Routes a request to its handler.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] that terminated the request.
    pub fn dispatch(&self, request: &Request) -> Result<Reply, DispatchError> {
        let base = Url::parse(BASE_URL).map_err(|error| DispatchError::internal(error.to_string()))?;
        let url = base
            .join(&request.url)
            .map_err(|error| DispatchError::invalid_argument(format!("bad url '{}': {error}", request.url)))?;

        let segments = self.segments(url.path())?;
        let mut params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        params.extend(request.params.iter().cloned());
        let body = decode_body(request.body.as_deref())?;

        let Some((name, rest)) = segments.split_first() else {
            return match request.method {
                Method::Get => self.index_reply(),
                method => Err(DispatchError::method_not_allowed(method, self.prefix.as_str())),
            };
        };
        let handler = self
            .by_name
            .get(name)
            .and_then(|slot| self.handlers.get(*slot))
            .ok_or_else(|| DispatchError::not_found(url.path()))?;

        debug!(
            target: DISPATCH_TARGET,
            method = %request.method,
            path = url.path(),
            handler = name.as_str(),
            "dispatching request"
        );
        let sub = SubRequest {
            method: request.method,
            path: rest.to_vec(),
            params,
            body,
        };
        let mut context = Context::new(&self.registry);
        handler.handle(sub, &mut context)
    }

    /// Decoded path segments below the prefix.
    fn segments(&self, path: &str) -> Result<Vec<String>, DispatchError> {
        let below = if path == self.prefix.trim_end_matches('/') {
            ""
        } else {
            path.strip_prefix(self.prefix.as_str())
                .ok_or_else(|| DispatchError::not_found(path))?
        };
        let mut segments = Vec::new();
        for raw in below.split('/').filter(|raw| !raw.is_empty()) {
            let segment = percent_decode_str(raw)
                .decode_utf8()
                .map_err(|error| DispatchError::invalid_argument(format!("path segment '{raw}': {error}")))?
                .into_owned();
            if segment.starts_with('_') {
                return Err(DispatchError::forbidden(segment));
            }
            segments.push(segment);
        }
        Ok(segments)
    }

    fn owner(&self, type_id: TypeId) -> Option<&dyn Handler> {
        self.by_type
            .get(&type_id)
            .and_then(|slot| self.handlers.get(*slot))
            .map(Box::as_ref)
    }

    fn embed(&self, instance: &Instance) -> Result<Value, DispatchError> {
        if let Some(handler) = self.owner(instance.type_id()) {
            return Ok(Value::Tagged(handler.embed(instance)?.to_tagged(&self.registry)?));
        }
        if let Some((slot, project)) = self.aliases.get(&instance.type_id()) {
            let projected = project(instance).ok_or_else(|| {
                DispatchError::internal(format!("alias for {} failed", instance.type_name()))
            })?;
            let handler = self
                .handlers
                .get(*slot)
                .ok_or_else(|| DispatchError::internal("alias points at no handler"))?;
            return Ok(Value::Tagged(handler.embed(&projected)?.to_tagged(&self.registry)?));
        }
        Ok(Value::Tagged(self.registry.encode_any(instance.as_any())?))
    }

    /// Renders a reply as wire text; `None` stands for "no value".
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when an object cannot be embedded.
    pub fn render(&self, reply: &Reply) -> Result<Option<String>, DispatchError> {
        let value = reply.render(self)?;
        if matches!(value, Value::Null) {
            return Ok(None);
        }
        Ok(Some(codec::to_text(&value)?))
    }

    /// Answers a request, turning failures into fault responses.
    #[must_use]
    pub fn respond(&self, request: &Request) -> Response {
        let outcome = self
            .dispatch(request)
            .and_then(|reply| self.render(&reply));
        match outcome {
            Ok(Some(body)) => Response::ok(body),
            Ok(None) => Response::no_content(),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    method = %request.method,
                    url = request.url.as_str(),
                    %error,
                    "request failed"
                );
                self.fault_response(&error)
            }
        }
    }

    /// Builds the `@Fault` response reporting `error`.
    #[must_use]
    pub fn fault_response(&self, error: &DispatchError) -> Response {
        let message = error.to_string();
        let fault = Fault {
            kind: error.kind(),
            message: message.clone(),
        };
        self.registry
            .encode(&fault)
            .and_then(|tagged| codec::to_text(&Value::Tagged(tagged)))
            .map_or_else(
                |_| Response::with_status(error.status(), message),
                |body| Response::with_status(error.status(), body),
            )
    }
}

fn decode_body(body: Option<&str>) -> Result<Option<Value>, DispatchError> {
    body.filter(|text| !text.trim().is_empty())
        .map(codec::from_text)
        .transpose()
        .map_err(DispatchError::from)
}

impl Substitute<Object> for Namespace {
    type Error = DispatchError;

    fn substitute(&self, object: &Object) -> Result<Value, DispatchError> {
        match object {
            Object::Instance(instance) => self.embed(instance),
            Object::Hyperlink(link) => Ok(Value::Tagged(link.to_tagged(&self.registry)?)),
            Object::Pending(_) => Err(DispatchError::internal(
                "pending results must be the whole reply of a waiting method",
            )),
        }
    }
}
