//! The hypermedia vocabulary.
//!
//! Every response either carries plain data or one of a fixed set of tagged
//! shapes describing how to act on or navigate from it. The server produces
//! these shapes when embedding application objects; the client turns them
//! into proxies.

mod fault;
mod shapes;

pub use fault::{ErrorKind, Fault};
pub use shapes::{Dataset, Form, Link, List, Members, Resource, Service, Waiter};

use crate::errors::CodecError;
use crate::registry::{Known, Registry};
use crate::value::TaggedValue;

/// Tag of [`Link`].
pub const LINK_TAG: &str = "Link";
/// Tag of [`Form`].
pub const FORM_TAG: &str = "Form";
/// Tag of [`Dataset`].
pub const DATASET_TAG: &str = "Dataset";
/// Tag of [`Resource`].
pub const RESOURCE_TAG: &str = "Resource";
/// Tag of [`List`].
pub const LIST_TAG: &str = "List";
/// Tag of [`Waiter`].
pub const WAITER_TAG: &str = "Waiter";
/// Tag of [`Service`].
pub const SERVICE_TAG: &str = "Service";
/// Tag of [`Fault`].
pub const FAULT_TAG: &str = "Fault";

pub(crate) fn register_vocabulary(registry: &mut Registry) {
    registry.insert::<Link>(LINK_TAG);
    registry.insert::<Form>(FORM_TAG);
    registry.insert::<Dataset>(DATASET_TAG);
    registry.insert::<Resource>(RESOURCE_TAG);
    registry.insert::<List>(LIST_TAG);
    registry.insert::<Waiter>(WAITER_TAG);
    registry.insert::<Service>(SERVICE_TAG);
    registry.insert::<Fault>(FAULT_TAG);
}

/// Any navigable hypermedia shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Hyperlink {
    /// See [`Link`].
    Link(Link),
    /// See [`Form`].
    Form(Form),
    /// See [`Dataset`].
    Dataset(Dataset),
    /// See [`Resource`].
    Resource(Resource),
    /// See [`List`].
    List(List),
    /// See [`Waiter`].
    Waiter(Waiter),
    /// See [`Service`].
    Service(Service),
}

impl Hyperlink {
    /// Recovers a hyperlink from a decoded registry instance.
    ///
    /// # Errors
    ///
    /// Hands the instance back when it is not part of the vocabulary.
    pub fn from_known(known: Known) -> Result<Self, Known> {
        known
            .downcast::<Link>()
            .map(Self::Link)
            .or_else(|other| other.downcast::<Form>().map(Self::Form))
            .or_else(|other| other.downcast::<Dataset>().map(Self::Dataset))
            .or_else(|other| other.downcast::<Resource>().map(Self::Resource))
            .or_else(|other| other.downcast::<List>().map(Self::List))
            .or_else(|other| other.downcast::<Waiter>().map(Self::Waiter))
            .or_else(|other| other.downcast::<Service>().map(Self::Service))
    }

    /// URL the hyperlink points at.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Link(link) => &link.url,
            Self::Form(form) => &form.url,
            Self::Dataset(dataset) => &dataset.url,
            Self::Resource(resource) => resource.url(),
            Self::List(list) => &list.collection,
            Self::Waiter(waiter) => &waiter.url,
            Self::Service(service) => service.url(),
        }
    }

    /// Encodes the hyperlink through `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTag`] when `registry` lacks the
    /// vocabulary.
    pub fn to_tagged(&self, registry: &Registry) -> Result<TaggedValue, CodecError> {
        match self {
            Self::Link(link) => registry.encode(link),
            Self::Form(form) => registry.encode(form),
            Self::Dataset(dataset) => registry.encode(dataset),
            Self::Resource(resource) => registry.encode(resource),
            Self::List(list) => registry.encode(list),
            Self::Waiter(waiter) => registry.encode(waiter),
            Self::Service(service) => registry.encode(service),
        }
    }
}

#[cfg(test)]
mod tests;
