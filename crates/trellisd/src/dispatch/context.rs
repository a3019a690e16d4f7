//! Per-request state handed down the dispatch tree.

use std::any::Any;
use std::sync::Arc;

use trellis_wire::{Method, Registry, Value};

use super::errors::DispatchError;
use super::object::Instance;
use super::query;

/// A request de-scoped to the handler answering it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRequest {
    /// Verb.
    pub method: Method,
    /// Decoded path segments below the handler.
    pub path: Vec<String>,
    /// Query parameters, URL pairs first.
    pub params: Vec<(String, String)>,
    /// Decoded body.
    pub body: Option<Value>,
}

impl SubRequest {
    /// First value of a query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Query parameters that are not private.
    pub fn public_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .filter(|(key, _)| !super::interface::is_private(key))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Splits off the first path segment.
    #[must_use]
    pub fn descend(mut self) -> (Option<String>, Self) {
        if self.path.is_empty() {
            return (None, self);
        }
        let head = self.path.remove(0);
        (Some(head), self)
    }

    /// Slash-joined remaining path, for messages.
    #[must_use]
    pub fn path_text(&self) -> String {
        self.path.join("/")
    }
}

/// An enclosing instance and the URL that addresses it.
#[derive(Debug, Clone)]
pub struct Frame {
    path: String,
    query: Vec<(String, String)>,
    instance: Instance,
}

impl Frame {
    /// Creates a frame for an instance addressed by `path` plus `query`.
    pub fn new(path: impl Into<String>, query: Vec<(String, String)>, instance: Instance) -> Self {
        Self {
            path: path.into(),
            query,
            instance,
        }
    }

    /// URL path of the instance, without query.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query pairs identifying the instance.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The enclosing instance.
    #[must_use]
    pub const fn instance(&self) -> &Instance {
        &self.instance
    }

    /// URL of the instance.
    #[must_use]
    pub fn url(&self) -> String {
        query::with_query(&self.path, &self.query)
    }

    /// URL of a member below the instance, query kept last.
    #[must_use]
    pub fn member_url(&self, member: &str) -> String {
        query::with_query(&format!("{}/{member}", self.path), &self.query)
    }
}

/// Request-scoped context: the codec registry and the chain of enclosing
/// instances, outermost first.
#[derive(Debug)]
pub struct Context<'a> {
    registry: &'a Registry,
    frames: Vec<Frame>,
}

impl<'a> Context<'a> {
    /// A context with no enclosing instances.
    #[must_use]
    pub const fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            frames: Vec::new(),
        }
    }

    /// Codec registry for decoding application-tagged arguments.
    #[must_use]
    pub const fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Pushes an enclosing instance.
    pub fn enter(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Innermost enclosing frame.
    #[must_use]
    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Enclosing instance addressed by `path`.
    #[must_use]
    pub fn enclosing(&self, path: &str) -> Option<&Instance> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.path == path)
            .map(|frame| &frame.instance)
    }

    /// Innermost enclosing instance as `T`, with its frame.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] when no frame is open or the
    /// innermost instance has another type.
    pub fn innermost_as<T: Any + Send + Sync>(&self) -> Result<(&Frame, Arc<T>), DispatchError> {
        let frame = self
            .innermost()
            .ok_or_else(|| DispatchError::internal("member invoked outside an instance"))?;
        let target = frame.instance.downcast::<T>().ok_or_else(|| {
            DispatchError::internal(format!(
                "enclosing instance is {}, not {}",
                frame.instance.type_name(),
                std::any::type_name::<T>()
            ))
        })?;
        Ok((frame, target))
    }
}
