//! Client error types.

use std::io;

use thiserror::Error;
use trellis_wire::{CodecError, ErrorKind, SelectorError};

/// Failures moving envelopes to and from the server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP endpoint did not resolve.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Rendered endpoint.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The connection could not be established.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Rendered endpoint.
        endpoint: String,
        /// Connect failure.
        #[source]
        source: io::Error,
    },
    /// Unix endpoints on a platform without Unix sockets.
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnix(String),
    /// The request envelope could not be serialised.
    #[error("failed to serialise request: {0}")]
    Encode(#[source] serde_json::Error),
    /// Writing the request failed.
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),
    /// Reading the response failed.
    #[error("failed to read response: {0}")]
    Receive(#[source] io::Error),
    /// The response envelope did not parse.
    #[error("failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),
    /// The server closed the connection without answering.
    #[error("server closed the connection without a response")]
    Closed,
}

/// Errors surfaced by [`Client`](crate::Client) verbs and proxies.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The exchange itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A body could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// The server answered with an error response.
    #[error("server answered {status} ({kind}): {message}")]
    Remote {
        /// Response status.
        status: u16,
        /// Error category reported by the server.
        kind: ErrorKind,
        /// Detail reported by the server.
        message: String,
    },
    /// The verb does not apply to the target; nothing was sent.
    #[error("{verb} cannot be used on {target}")]
    MethodMismatch {
        /// Client verb.
        verb: &'static str,
        /// Description of the target.
        target: String,
    },
    /// A remote object has no member of that name.
    #[error("{kind} has no attribute, link or method named '{name}'")]
    AttributeNotFound {
        /// Kind of the remote object.
        kind: String,
        /// Requested member.
        name: String,
    },
    /// Arguments or selectors were rejected before sending.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },
    /// The verb exists but is not supported by the protocol.
    #[error("{verb} is not implemented")]
    Unimplemented {
        /// Client verb.
        verb: &'static str,
    },
    /// A waiter was still pending after the allowed number of polls.
    #[error("waiter still pending after {attempts} polls")]
    WaitExhausted {
        /// Polls made.
        attempts: u32,
    },
    /// A URL could not be resolved against its base.
    #[error("cannot resolve url '{url}': {source}")]
    Url {
        /// Offending reference.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
    /// The server answered with a value of the wrong shape.
    #[error("expected {expected} from the server, found {found}")]
    UnexpectedReply {
        /// Shape the verb needs.
        expected: &'static str,
        /// Shape received.
        found: String,
    },
}

impl ClientError {
    /// Creates an [`ClientError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(verb: &'static str, target: impl Into<String>) -> Self {
        Self::MethodMismatch {
            verb,
            target: target.into(),
        }
    }

    /// Error category, when the server reported one.
    #[must_use]
    pub const fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<SelectorError> for ClientError {
    fn from(error: SelectorError) -> Self {
        Self::invalid_argument(error.to_string())
    }
}
