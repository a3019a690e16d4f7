//! Process-lifetime instances.

use std::any::TypeId;
use std::sync::Arc;

use trellis_wire::hypermedia::Link;
use trellis_wire::{Hyperlink, Method};

use super::{Bind, Exposed, Handler, MethodTable, expect_instance};
use crate::dispatch::context::{Context, Frame, SubRequest};
use crate::dispatch::errors::{DispatchError, RegistrationError};
use crate::dispatch::object::{Instance, Object, Reply};

/// Node owning the one instance of `T`, built at registration.
pub struct SingletonHandler<T> {
    url: String,
    instance: Arc<T>,
    table: MethodTable<T>,
}

impl<T: Exposed> Bind<T> for SingletonHandler<T> {
    fn bind(url: String, instance: T) -> Result<Self, RegistrationError> {
        Ok(Self {
            url,
            instance: Arc::new(instance),
            table: MethodTable::declare()?,
        })
    }
}

impl<T: Exposed> Handler for SingletonHandler<T> {
    fn url(&self) -> &str {
        &self.url
    }

    fn embeds(&self) -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn describe(&self) -> Hyperlink {
        Hyperlink::Link(Link::new(self.url.as_str()))
    }

    fn embed(&self, instance: &Instance) -> Result<Hyperlink, DispatchError> {
        let target = expect_instance::<T>(instance)?;
        self.table
            .resource(target, self.url.clone())
            .map(Hyperlink::Resource)
    }

    fn handle(
        &self,
        request: SubRequest,
        context: &mut Context<'_>,
    ) -> Result<Reply, DispatchError> {
        let instance = Instance::shared(Arc::clone(&self.instance));
        if request.path.is_empty() {
            return match request.method {
                Method::Get => Ok(Reply::Object(Object::Instance(instance))),
                method => Err(DispatchError::method_not_allowed(method, self.url.as_str())),
            };
        }
        context.enter(Frame::new(self.url.as_str(), Vec::new(), instance));
        self.table.invoke(request, context)
    }
}
