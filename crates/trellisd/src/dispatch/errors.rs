//! Error types for routing and registration.
//!
//! [`DispatchError`] terminates the current request and is reported to the
//! caller as a `@Fault` body; [`RegistrationError`] is raised while the
//! dispatch tree is being assembled at startup.

use thiserror::Error;
use trellis_wire::{CodecError, ErrorKind, Method, SelectorError};

use crate::store::StoreError;

/// Errors surfaced while answering a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler, member or record answers to the path.
    #[error("nothing at '{path}'")]
    NotFound { path: String },

    /// A path segment names a private member.
    #[error("path segment '{segment}' is private")]
    Forbidden { segment: String },

    /// The addressed node does not accept the verb.
    #[error("{method} is not allowed on '{path}'")]
    MethodNotAllowed { method: Method, path: String },

    /// Missing, unknown or malformed argument.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The node reserves the path suffix but does not implement it.
    #[error("'{path}' is not implemented")]
    NotImplemented { path: String },

    /// Body or embedding could not pass through the codec.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A `where` parameter failed to parse.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// The collection backend refused the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Application code reported a failure.
    #[error("{message}")]
    Failed { message: String },

    /// Broken server-side invariant.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Protocol category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::MethodNotAllowed { .. } => ErrorKind::MethodNotAllowed,
            Self::Codec(CodecError::InvalidTag { .. }) => ErrorKind::InvalidTag,
            Self::InvalidArgument { .. }
            | Self::Codec(_)
            | Self::Selector(_)
            | Self::Store(
                StoreError::Conflict { .. }
                | StoreError::UnaddressableKey { .. }
                | StoreError::InvalidRecord { .. },
            ) => {
                ErrorKind::InvalidArgument
            }
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::Failed { .. } => ErrorKind::Failed,
            Self::Internal { .. }
            | Self::Store(StoreError::Poisoned | StoreError::Unreadable { .. }) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status reported for the error.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.kind().status()
    }

    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a forbidden error.
    pub fn forbidden(segment: impl Into<String>) -> Self {
        Self::Forbidden {
            segment: segment.into(),
        }
    }

    /// Creates a method-not-allowed error.
    pub fn method_not_allowed(method: Method, path: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            method,
            path: path.into(),
        }
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not-implemented error.
    pub fn not_implemented(path: impl Into<String>) -> Self {
        Self::NotImplemented { path: path.into() }
    }

    /// Creates an application failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Errors raised while building a dispatch tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// Another handler already uses the name.
    #[error("handler '{name}' is already registered")]
    DuplicateName { name: String },

    /// Handler, member or parameter names may not start with `_`.
    #[error("'{name}' is private and cannot be exposed")]
    PrivateName { name: String },

    /// Names must be non-empty single path segments.
    #[error("'{name}' is not a valid path segment")]
    InvalidName { name: String },

    /// An interface declares a member or parameter twice.
    #[error("'{name}' is declared more than once by {owner}")]
    DuplicateMember { owner: String, name: String },

    /// A safe method declared parameters.
    #[error("safe method '{name}' of {owner} cannot take parameters")]
    SafeWithParameters { owner: String, name: String },

    /// An alias names no registered handler.
    #[error("no handler named '{name}' to alias")]
    UnknownHandler { name: String },
}

impl RegistrationError {
    pub(crate) fn check_name(name: &str) -> Result<(), Self> {
        if name.is_empty() || name.contains('/') || name.contains('?') {
            return Err(Self::InvalidName {
                name: name.to_owned(),
            });
        }
        if super::interface::is_private(name) {
            return Err(Self::PrivateName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }
}
