//! Values returned by application code before embedding.

use std::any::{Any, TypeId, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use trellis_wire::{Hyperlink, Tree, Value};

/// What handlers and application code return: plain data with runtime
/// objects at any depth. The namespace embeds the objects when rendering.
pub type Reply = Tree<Object>;

/// A runtime object awaiting embedding.
#[derive(Debug, Clone)]
pub enum Object {
    /// An application instance, embedded by the handler that owns its type
    /// or encoded through the registry.
    Instance(Instance),
    /// Hypermedia built by a handler.
    Hyperlink(Hyperlink),
    /// A deferred result; only valid as the whole reply of a waiting method.
    Pending(Pending),
}

impl Object {
    /// Reply consisting of one application instance.
    pub fn instance<T: Any + Send + Sync>(value: T) -> Reply {
        Tree::Object(Self::Instance(Instance::new(value)))
    }

    /// Reply consisting of one hyperlink.
    #[must_use]
    pub const fn hyperlink(link: Hyperlink) -> Reply {
        Tree::Object(Self::Hyperlink(link))
    }

    /// Reply deferring the result to a later poll.
    #[must_use]
    pub const fn pending(pending: Pending) -> Reply {
        Tree::Object(Self::Pending(pending))
    }
}

/// A type-erased, shareable application instance.
#[derive(Clone)]
pub struct Instance {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wraps an owned value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    /// Wraps a value that stays shared with its owner.
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value,
        }
    }

    /// Runtime type of the wrapped value.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the wrapped type, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrows the value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    /// Shares the value as `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Borrows the erased value.
    #[must_use]
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.value
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Instance")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// State carried by a waiter's continuation URL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pending {
    state: BTreeMap<String, Value>,
}

impl Pending {
    /// Pending result with no state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: BTreeMap::new(),
        }
    }

    /// Adds a state entry handed back to the readiness step on the next poll.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.state.insert(name.to_owned(), value.into());
        self
    }

    /// State entries.
    #[must_use]
    pub const fn state(&self) -> &BTreeMap<String, Value> {
        &self.state
    }
}
