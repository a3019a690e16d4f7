//! Error bodies carried by failed responses.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::CodecError;
use crate::fields::Fields;
use crate::registry::WireType;
use crate::value::Value;

/// Protocol error taxonomy shared by server and client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ErrorKind {
    /// Unknown path segment, handler or record key.
    NotFound,
    /// Private path segment.
    Forbidden,
    /// Verb not accepted by the addressed node.
    MethodNotAllowed,
    /// Missing, duplicate or malformed argument or selector.
    InvalidArgument,
    /// Codec misuse.
    InvalidTag,
    /// Path suffix the node does not implement.
    NotImplemented,
    /// Application code or a backend reported a failure.
    Failed,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code for the kind.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::MethodNotAllowed => 405,
            Self::InvalidArgument | Self::InvalidTag => 400,
            Self::NotImplemented => 501,
            Self::Failed | Self::Internal => 500,
        }
    }
}

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl WireType for Fault {
    fn to_payload(&self) -> Value {
        Fields::new()
            .with("kind", self.kind.to_string())
            .with("message", &self.message)
            .into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        let kind: String = fields.take("kind")?;
        Ok(Self {
            kind: kind.parse().unwrap_or(ErrorKind::Internal),
            message: fields.take_or_default("message")?,
        })
    }
}
