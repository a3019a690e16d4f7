//! Turns response bodies into proxies.
//!
//! The resolver is the client's decode-side hook: every hypermedia shape in
//! a reply becomes the matching [`Remote`] proxy, with its URLs resolved
//! against the URL of the request that produced it. Attribute values and
//! listing items are resolved recursively, so an index or a record can carry
//! further proxies.

use std::collections::BTreeMap;

use trellis_wire::hypermedia::{Fault, Members};
use trellis_wire::{
    Decoded, ErrorKind, Hyperlink, Registry, Resolve, Response, TaggedValue, Tree, Value, codec,
};
use url::Url;

use crate::errors::ClientError;
use crate::proxy::{
    Remote, RemoteDataset, RemoteFunction, RemoteList, RemoteObject, RemoteWaiter, Reply,
};
use crate::urls;

/// Tracing target for resolver operations.
pub(crate) const RESOLVER_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::resolver");

/// Status carrying no body.
const STATUS_NO_CONTENT: u16 = 204;

/// Decode-side hook resolving hypermedia against one base URL.
pub(crate) struct Resolver<'r> {
    registry: &'r Registry,
    base: Url,
}

impl<'r> Resolver<'r> {
    pub(crate) const fn new(registry: &'r Registry, base: Url) -> Self {
        Self { registry, base }
    }

    fn url(&self, reference: &str) -> Result<String, ClientError> {
        urls::resolve(&self.base, reference)
    }

    fn values(&mut self, values: Vec<Value>) -> Result<Vec<Reply>, ClientError> {
        values
            .into_iter()
            .map(|value| Tree::resolve(value, self))
            .collect()
    }

    fn members(&mut self, members: &Members) -> Result<BTreeMap<String, Reply>, ClientError> {
        members
            .attributes()
            .iter()
            .map(|(name, value)| Ok((name.clone(), Tree::resolve(value.clone(), self)?)))
            .collect()
    }

    fn proxy(&mut self, link: Hyperlink) -> Result<Remote, ClientError> {
        Ok(match link {
            Hyperlink::Link(link) => Remote::Function(RemoteFunction::link(self.url(&link.url)?, link.value)),
            Hyperlink::Form(form) => Remote::Function(RemoteFunction::form(
                self.url(&form.url)?,
                form.arguments,
                form.defaults,
            )),
            Hyperlink::Dataset(dataset) => Remote::Dataset(RemoteDataset::new(
                dataset.kind,
                self.url(&dataset.url)?,
                dataset.create,
                dataset.selectors,
                dataset.key,
            )),
            Hyperlink::Resource(resource) => {
                let collection = resource.collection().map(|url| self.url(url)).transpose()?;
                Remote::Object(
                    RemoteObject::new(
                        resource.kind().to_owned(),
                        self.url(resource.url())?,
                        resource.members().links().to_vec(),
                        resource.members().methods().clone(),
                        self.members(resource.members())?,
                    )
                    .with_collection(collection, resource.key().map(str::to_owned)),
                )
            }
            Hyperlink::Service(service) => Remote::Object(RemoteObject::new(
                service.kind().to_owned(),
                self.url(service.url())?,
                service.members().links().to_vec(),
                service.members().methods().clone(),
                self.members(service.members())?,
            )),
            Hyperlink::List(list) => {
                let collection = self.url(&list.collection)?;
                let items = self.values(list.items)?;
                Remote::List(RemoteList::new(
                    list.kind,
                    collection,
                    items,
                    list.selector,
                    list.continuation,
                ))
            }
            Hyperlink::Waiter(waiter) => Remote::Waiter(RemoteWaiter::new(self.url(&waiter.url)?)),
        })
    }
}

impl Resolve<Remote> for Resolver<'_> {
    type Error = ClientError;

    fn resolve(&mut self, tagged: TaggedValue) -> Result<Reply, ClientError> {
        let original = tagged.clone();
        match self.registry.decode(tagged)? {
            Decoded::Opaque(opaque) => Ok(Tree::Data(Value::Tagged(opaque))),
            Decoded::Known(known) => Hyperlink::from_known(known).map_or_else(
                |_| Ok(Tree::Data(Value::Tagged(original))),
                |link| self.proxy(link).map(Tree::Object),
            ),
        }
    }
}

/// Decodes a response to the request sent to `base`.
///
/// # Errors
///
/// Returns [`ClientError::Remote`] for error statuses, or the first codec or
/// URL failure.
pub(crate) fn decode_response(
    registry: &Registry,
    base: Url,
    response: &Response,
) -> Result<Reply, ClientError> {
    if !response.is_success() {
        return Err(remote_error(registry, response));
    }
    if response.status == STATUS_NO_CONTENT || response.body.trim().is_empty() {
        return Ok(Tree::null());
    }
    codec::decode_with(&response.body, &mut Resolver::new(registry, base))
}

fn remote_error(registry: &Registry, response: &Response) -> ClientError {
    let fault = match codec::from_text(&response.body) {
        Ok(Value::Tagged(tagged)) => registry.decode_as::<Fault>(tagged).ok(),
        _ => None,
    };
    fault.map_or_else(
        || ClientError::Remote {
            status: response.status,
            kind: ErrorKind::Internal,
            message: response.body.clone(),
        },
        |fault| ClientError::Remote {
            status: response.status,
            kind: fault.kind,
            message: fault.message,
        },
    )
}

#[cfg(test)]
mod tests;
