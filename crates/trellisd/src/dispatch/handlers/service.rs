//! Stateless method namespaces.

use std::any::TypeId;

use trellis_wire::hypermedia::{Link, Service};
use trellis_wire::{Hyperlink, Method};

use super::{Bind, Exposed, Handler, MethodTable, expect_instance};
use crate::dispatch::context::{Context, Frame, SubRequest};
use crate::dispatch::errors::{DispatchError, RegistrationError};
use crate::dispatch::object::{Instance, Object, Reply};

/// Node exposing the methods of a cloneable service value.
///
/// Every request works on a fresh clone, so services cannot carry state
/// between calls.
pub struct ServiceHandler<S> {
    url: String,
    service: S,
    table: MethodTable<S>,
}

impl<S: Exposed + Clone> Bind<S> for ServiceHandler<S> {
    fn bind(url: String, service: S) -> Result<Self, RegistrationError> {
        Ok(Self {
            url,
            service,
            table: MethodTable::declare()?,
        })
    }
}

impl<S: Exposed + Clone> Handler for ServiceHandler<S> {
    fn url(&self) -> &str {
        &self.url
    }

    fn embeds(&self) -> Vec<TypeId> {
        vec![TypeId::of::<S>()]
    }

    fn describe(&self) -> Hyperlink {
        Hyperlink::Link(Link::new(self.url.as_str()))
    }

    fn embed(&self, instance: &Instance) -> Result<Hyperlink, DispatchError> {
        let service = expect_instance::<S>(instance)?;
        let members = self.table.interface().members(service.attributes()?)?;
        Ok(Hyperlink::Service(Service::new(
            self.table.interface().kind(),
            self.url.as_str(),
            members,
        )))
    }

    fn handle(
        &self,
        request: SubRequest,
        context: &mut Context<'_>,
    ) -> Result<Reply, DispatchError> {
        if request.path.is_empty() {
            return match request.method {
                Method::Get => Ok(Object::instance(self.service.clone())),
                method => Err(DispatchError::method_not_allowed(method, self.url.as_str())),
            };
        }
        context.enter(Frame::new(
            self.url.as_str(),
            Vec::new(),
            Instance::new(self.service.clone()),
        ));
        self.table.invoke(request, context)
    }
}
