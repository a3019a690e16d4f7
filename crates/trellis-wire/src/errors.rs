//! Error types for wire encoding and decoding.

use thiserror::Error;

use crate::value::Value;

/// Errors raised while printing, parsing or converting wire values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A tag name is reserved, malformed or bound inconsistently.
    #[error("invalid tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: String },

    /// The text does not follow the wire grammar.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A value had the wrong shape for the requested conversion.
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },

    /// A tagged mapping lacked a required field.
    #[error("missing field '{field}'")]
    MissingField { field: String },

    /// A value had the right shape but an unusable content.
    #[error("invalid value: {message}")]
    InvalidValue { message: String },
}

impl CodecError {
    /// Creates an invalid tag error.
    pub fn invalid_tag(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTag {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Creates a syntax error anchored at a byte offset.
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Creates a mismatch error from the expected description and the value
    /// actually found.
    pub fn mismatch(expected: impl Into<String>, found: &Value) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            found: found.kind_name().to_owned(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}

/// Errors raised while parsing selector text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// A clause had no key before its operator.
    #[error("selector clause '{clause}' has no key")]
    MissingKey { clause: String },

    /// A key contained characters outside the identifier set.
    #[error("invalid selector key '{key}'")]
    InvalidKey { key: String },

    /// A clause value could not be parsed.
    #[error("invalid value in selector clause '{clause}': {source}")]
    InvalidValue {
        clause: String,
        #[source]
        source: CodecError,
    },

    /// `in` and `notin` need a list operand.
    #[error("operator '{operator}' in clause '{clause}' requires a list")]
    ExpectedList { clause: String, operator: String },
}
