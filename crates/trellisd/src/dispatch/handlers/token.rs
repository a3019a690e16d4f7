//! Instances rebuilt from their URL on every request.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use trellis_wire::hypermedia::Form;
use trellis_wire::{Hyperlink, Method, Value};

use super::{Bind, Exposed, Handler, MethodTable, expect_instance};
use crate::dispatch::context::{Context, Frame, SubRequest};
use crate::dispatch::errors::{DispatchError, RegistrationError};
use crate::dispatch::interface::{Args, Params};
use crate::dispatch::object::{Instance, Object, Reply};
use crate::dispatch::query;

/// A value whose whole state lives in its query string.
///
/// The server never stores tokens: `build` runs on every request that
/// addresses one, fed with the parameters `state` produced when it was
/// embedded.
pub trait Token: Exposed {
    /// Construction parameters.
    fn params() -> Params;

    /// Rebuilds the token from bound construction arguments.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] for unusable arguments.
    fn build(args: Args) -> Result<Self, DispatchError>;

    /// Construction arguments that rebuild `self`.
    fn state(&self) -> BTreeMap<String, Value>;
}

/// Node answering for a [`Token`] type.
pub struct TokenHandler<T> {
    url: String,
    params: Params,
    table: MethodTable<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Token> TokenHandler<T> {
    fn template(&self) -> Form {
        Form {
            url: self.url.clone(),
            arguments: self.params.names(),
            defaults: self.params.defaults(),
        }
    }

    fn rebuild(&self, request: &SubRequest) -> Result<T, DispatchError> {
        let supplied: BTreeMap<String, Value> = request
            .public_params()
            .filter(|(name, _)| self.params.declares(name))
            .map(|(name, text)| (name.to_owned(), query::decode_value(text)))
            .collect();
        T::build(Args::bind(&self.params, Some(Value::Map(supplied)))?)
    }
}

impl<T: Token> Bind<PhantomData<T>> for TokenHandler<T> {
    fn bind(url: String, _token: PhantomData<T>) -> Result<Self, RegistrationError> {
        let table = MethodTable::declare()?;
        let params = T::params();
        params.validate(table.interface().kind())?;
        Ok(Self {
            url,
            params,
            table,
            _marker: PhantomData,
        })
    }
}

impl<T: Token> Handler for TokenHandler<T> {
    fn url(&self) -> &str {
        &self.url
    }

    fn embeds(&self) -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn describe(&self) -> Hyperlink {
        Hyperlink::Form(self.template())
    }

    fn embed(&self, instance: &Instance) -> Result<Hyperlink, DispatchError> {
        let token = expect_instance::<T>(instance)?;
        let pairs = query::encode_state(&token.state())?;
        self.table
            .resource(token, query::with_query(&self.url, &pairs))
            .map(Hyperlink::Resource)
    }

    fn handle(
        &self,
        request: SubRequest,
        context: &mut Context<'_>,
    ) -> Result<Reply, DispatchError> {
        let addressed = request.public_params().next().is_some();
        if request.path.is_empty() {
            return match (request.method, addressed) {
                (Method::Get, false) => Ok(Object::hyperlink(self.describe())),
                (Method::Post, false) => {
                    let args = Args::bind(&self.params, request.body)?;
                    Ok(Object::instance(T::build(args)?))
                }
                (Method::Get, true) => Ok(Object::instance(self.rebuild(&request)?)),
                (method, _) => Err(DispatchError::method_not_allowed(method, self.url.as_str())),
            };
        }

        // Without state the URL names the template, which has no methods.
        if !addressed && !self.params.is_empty() {
            return Err(DispatchError::not_implemented(format!(
                "{}/{}",
                self.url,
                request.path.join("/")
            )));
        }
        let token = self.rebuild(&request)?;
        let state = query::encode_state(&token.state())?;
        context.enter(Frame::new(self.url.as_str(), state, Instance::new(token)));
        self.table.invoke(request, context)
    }
}
