//! Standalone callables.

use std::any::TypeId;

use trellis_wire::Hyperlink;

use super::{Bind, Endpoint, Handler, WAIT_SEGMENT};
use crate::dispatch::context::{Context, SubRequest};
use crate::dispatch::errors::{DispatchError, RegistrationError};
use crate::dispatch::interface::{Args, Signature};
use crate::dispatch::object::{Instance, Reply};

/// A free-standing function mounted under its own name.
pub trait Function: Send + Sync + 'static {
    /// Declared invocation shape.
    fn signature(&self) -> Signature;

    /// Runs the function.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] reported to the caller.
    fn invoke(&self, args: Args, context: &Context<'_>) -> Result<Reply, DispatchError>;

    /// Readiness step polled under `wait` when the signature is waiting.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] reported to the caller.
    fn resume(&self, _state: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        Err(DispatchError::not_implemented(WAIT_SEGMENT))
    }
}

/// Node answering for one [`Function`].
pub struct FunctionHandler<F> {
    url: String,
    signature: Signature,
    function: F,
}

impl<F: Function> Bind<F> for FunctionHandler<F> {
    fn bind(url: String, function: F) -> Result<Self, RegistrationError> {
        let signature = function.signature();
        signature.validate(std::any::type_name::<F>(), &url)?;
        Ok(Self {
            url,
            signature,
            function,
        })
    }
}

impl<F: Function> Handler for FunctionHandler<F> {
    fn url(&self) -> &str {
        &self.url
    }

    fn embeds(&self) -> Vec<TypeId> {
        vec![TypeId::of::<F>()]
    }

    fn describe(&self) -> Hyperlink {
        self.signature.hyperlink(&self.url)
    }

    fn embed(&self, instance: &Instance) -> Result<Hyperlink, DispatchError> {
        if instance.type_id() != TypeId::of::<F>() {
            return Err(DispatchError::internal(format!(
                "cannot embed {} as a function at '{}'",
                instance.type_name(),
                self.url
            )));
        }
        Ok(self.describe())
    }

    fn handle(
        &self,
        request: SubRequest,
        context: &mut Context<'_>,
    ) -> Result<Reply, DispatchError> {
        let shared: &Context<'_> = context;
        Endpoint::new(self.url.clone(), &[], &self.signature).dispatch(
            request,
            |args| self.function.invoke(args, shared),
            |state| self.function.resume(state, shared),
        )
    }
}
