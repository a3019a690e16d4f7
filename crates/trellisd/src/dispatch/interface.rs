//! Registration-time declarations of what an application type exposes.
//!
//! An [`Interface`] is built once per registered type and maps each exposed
//! method to its [`Signature`]. Request bodies are bound against a signature's
//! [`Params`] to produce [`Args`].

use std::collections::{BTreeMap, BTreeSet};

use trellis_wire::hypermedia::{Form, Link, Members};
use trellis_wire::{FromValue, Hyperlink, Value};

use super::errors::{DispatchError, RegistrationError};

/// Returns `true` for names hidden from the wire.
#[must_use]
pub fn is_private(name: &str) -> bool {
    name.starts_with('_')
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    default: Option<Value>,
}

impl Param {
    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value used when the caller leaves the parameter out.
    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Ordered parameter list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    params: Vec<Param>,
}

impl Params {
    /// An empty parameter list.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Appends a parameter the caller must supply.
    #[must_use]
    pub fn required(mut self, name: &str) -> Self {
        self.params.push(Param {
            name: name.to_owned(),
            default: None,
        });
        self
    }

    /// Appends a parameter with a default.
    #[must_use]
    pub fn optional(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.to_owned(),
            default: Some(default.into()),
        });
        self
    }

    /// Declared parameters in order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.params.iter()
    }

    /// Declared names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|param| param.name.clone()).collect()
    }

    /// Defaults keyed by parameter name.
    #[must_use]
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.params
            .iter()
            .filter_map(|param| {
                param
                    .default
                    .as_ref()
                    .map(|value| (param.name.clone(), value.clone()))
            })
            .collect()
    }

    /// Returns `true` when the list declares `name`.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|param| param.name == name)
    }

    /// Returns `true` when nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn validate(&self, owner: &str) -> Result<(), RegistrationError> {
        let mut seen = BTreeSet::new();
        for param in &self.params {
            RegistrationError::check_name(&param.name)?;
            if !seen.insert(param.name.as_str()) {
                return Err(RegistrationError::DuplicateMember {
                    owner: owner.to_owned(),
                    name: param.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// How a method or function is invoked.
///
/// Safe signatures take no parameters and are invoked with GET; all others
/// need POST with a body. A waiting signature may answer with a pending
/// result that the caller polls under `/wait`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    params: Params,
    safe: bool,
    waits: bool,
}

impl Signature {
    /// A zero-argument, non-mutating signature.
    #[must_use]
    pub const fn safe() -> Self {
        Self {
            params: Params::new(),
            safe: true,
            waits: false,
        }
    }

    /// A signature invoked with POST.
    #[must_use]
    pub const fn new(params: Params) -> Self {
        Self {
            params,
            safe: false,
            waits: false,
        }
    }

    /// Marks the signature as able to return a pending result.
    #[must_use]
    pub const fn waiting(mut self) -> Self {
        self.waits = true;
        self
    }

    /// Declared parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns `true` for GET-invokable signatures.
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        self.safe
    }

    /// Returns `true` when the signature may return a pending result.
    #[must_use]
    pub const fn waits(&self) -> bool {
        self.waits
    }

    /// Link for safe signatures, form for everything else.
    #[must_use]
    pub fn hyperlink(&self, url: &str) -> Hyperlink {
        if self.safe {
            Hyperlink::Link(Link::new(url))
        } else {
            Hyperlink::Form(Form {
                url: url.to_owned(),
                arguments: self.params.names(),
                defaults: self.params.defaults(),
            })
        }
    }

    pub(crate) fn validate(&self, owner: &str, name: &str) -> Result<(), RegistrationError> {
        if self.safe && !self.params.is_empty() {
            return Err(RegistrationError::SafeWithParameters {
                owner: owner.to_owned(),
                name: name.to_owned(),
            });
        }
        self.params.validate(owner)
    }
}

/// Kind name and exposed methods of an application type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interface {
    kind: String,
    methods: Vec<(String, Signature)>,
}

impl Interface {
    /// Starts a declaration for `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            methods: Vec::new(),
        }
    }

    /// Declares a method.
    #[must_use]
    pub fn method(mut self, name: &str, signature: Signature) -> Self {
        self.methods.push((name.to_owned(), signature));
        self
    }

    /// Kind name.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Looks up a method's signature.
    #[must_use]
    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.methods
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, signature)| signature)
    }

    /// Declared methods in order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &Signature)> {
        self.methods
            .iter()
            .map(|(name, signature)| (name.as_str(), signature))
    }

    /// Checks member names once, at registration.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] for private, malformed or duplicate
    /// names, and for safe methods that declare parameters.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let mut seen = BTreeSet::new();
        for (name, signature) in &self.methods {
            RegistrationError::check_name(name)?;
            if !seen.insert(name.as_str()) {
                return Err(RegistrationError::DuplicateMember {
                    owner: self.kind.clone(),
                    name: name.clone(),
                });
            }
            signature.validate(&self.kind, name)?;
        }
        Ok(())
    }

    /// Builds the embedded member tables for an instance.
    ///
    /// Private attributes are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] when an attribute shares a name
    /// with a method.
    pub fn members(&self, attributes: BTreeMap<String, Value>) -> Result<Members, DispatchError> {
        let links = self
            .methods
            .iter()
            .filter(|(_, signature)| signature.safe)
            .map(|(name, _)| name.clone())
            .collect();
        let methods = self
            .methods
            .iter()
            .filter(|(_, signature)| !signature.safe)
            .map(|(name, signature)| (name.clone(), signature.params.names()))
            .collect();
        let visible = attributes
            .into_iter()
            .filter(|(name, _)| !is_private(name))
            .collect();
        Members::new(links, methods, visible)
            .map_err(|error| DispatchError::internal(format!("{}: {error}", self.kind)))
    }
}

/// Arguments bound to a parameter list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    values: BTreeMap<String, Value>,
}

impl Args {
    /// No arguments.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Wraps values without checking them against a declaration.
    #[must_use]
    pub const fn from_values(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    /// Binds a decoded body against `params`.
    ///
    /// An absent body binds like an empty mapping. Defaults fill parameters
    /// the body leaves out.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] when the body is not a
    /// mapping, names an undeclared parameter, or omits a required one.
    pub fn bind(params: &Params, body: Option<Value>) -> Result<Self, DispatchError> {
        let mut supplied = match body {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Map(entries)) => entries,
            Some(other) => {
                return Err(DispatchError::invalid_argument(format!(
                    "arguments must be a mapping, found {}",
                    other.kind_name()
                )));
            }
        };
        if let Some(unknown) = supplied.keys().find(|name| !params.declares(name)) {
            return Err(DispatchError::invalid_argument(format!(
                "unexpected argument '{unknown}'"
            )));
        }

        let mut values = BTreeMap::new();
        for param in params {
            let value = supplied
                .remove(param.name())
                .or_else(|| param.default().cloned())
                .ok_or_else(|| {
                    DispatchError::invalid_argument(format!(
                        "missing argument '{}'",
                        param.name()
                    ))
                })?;
            values.insert(param.name.clone(), value);
        }
        Ok(Self { values })
    }

    /// Borrows an argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Removes and converts an argument.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] when the argument is absent
    /// or has the wrong type.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, DispatchError> {
        let value = self
            .values
            .remove(name)
            .ok_or_else(|| DispatchError::invalid_argument(format!("missing argument '{name}'")))?;
        T::from_value(value)
            .map_err(|error| DispatchError::invalid_argument(format!("argument '{name}': {error}")))
    }

    /// Removes and converts an argument that may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] when the argument has the
    /// wrong type.
    pub fn take_optional<T: FromValue>(&mut self, name: &str) -> Result<Option<T>, DispatchError> {
        match self.values.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::from_value(value).map(Some).map_err(|error| {
                DispatchError::invalid_argument(format!("argument '{name}': {error}"))
            }),
        }
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Unwraps the bound values.
    #[must_use]
    pub fn into_values(self) -> BTreeMap<String, Value> {
        self.values
    }
}
