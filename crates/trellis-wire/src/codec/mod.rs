//! Text codec for wire values.
//!
//! Values print as a JSON superset in which any value may be prefixed by an
//! `@tag`. A fixed set of tag spellings is reserved for primitives JSON cannot
//! express directly (bytes, durations, datetimes, sets and non-finite floats);
//! every other tag is application-defined and survives decoding as a
//! [`TaggedValue`](crate::TaggedValue) unless a transform hook claims it.

mod parser;
mod printer;

use crate::errors::CodecError;
use crate::tree::{Resolve, Substitute, Tree};
use crate::value::Value;

/// Media type naming the codec in both directions.
pub const CONTENT_TYPE: &str = "application/x-trellis-rson";

/// Tag spellings owned by the codec itself.
pub const RESERVED_TAGS: [&str; 14] = [
    "bool",
    "int",
    "float",
    "complex",
    "string",
    "bytestring",
    "base64",
    "duration",
    "datetime",
    "set",
    "list",
    "dict",
    "object",
    "unknown",
];

/// Maximum nesting accepted by the parser.
pub const MAX_DEPTH: usize = 256;

/// Returns `true` when `name` is one of [`RESERVED_TAGS`].
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_TAGS.contains(&name)
}

/// Checks that `name` can be used as an application tag.
///
/// # Errors
///
/// Returns [`CodecError::InvalidTag`] when the name is empty, contains
/// characters outside `[A-Za-z0-9_.:-]`, starts with a digit or punctuation,
/// or is reserved.
pub fn validate_tag(name: &str) -> Result<(), CodecError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(CodecError::invalid_tag(name, "tag names cannot be empty"));
    };
    if !is_tag_start(first) || !chars.all(is_tag_char) {
        return Err(CodecError::invalid_tag(name, "tag names must be identifiers"));
    }
    if is_reserved(name) {
        return Err(CodecError::invalid_tag(name, "tag name is reserved"));
    }
    Ok(())
}

pub(crate) const fn is_tag_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

pub(crate) const fn is_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | ':' | '-')
}

/// Prints a value in canonical text form.
///
/// # Errors
///
/// Fails when a set holds duplicates or a datetime cannot be formatted.
pub fn to_text(value: &Value) -> Result<String, CodecError> {
    let mut out = String::new();
    printer::print(value, &mut out)?;
    Ok(out)
}

/// Parses a complete document.
///
/// # Errors
///
/// Returns [`CodecError::Syntax`] for malformed text and
/// [`CodecError::InvalidTag`] for misuse of reserved tags.
pub fn from_text(text: &str) -> Result<Value, CodecError> {
    parser::Parser::new(text).document()
}

/// Renders a tree through `hook` and prints the result.
///
/// # Errors
///
/// Propagates substitution failures and printing errors.
pub fn encode_with<O, S>(tree: &Tree<O>, hook: &S) -> Result<String, S::Error>
where
    S: Substitute<O>,
{
    let value = tree.render(hook)?;
    Ok(to_text(&value)?)
}

/// Parses `text` and lets `hook` resolve every application-tagged value.
///
/// # Errors
///
/// Propagates parse failures and resolution failures.
pub fn decode_with<O, R>(text: &str, hook: &mut R) -> Result<Tree<O>, R::Error>
where
    R: Resolve<O>,
{
    let value = from_text(text)?;
    Tree::resolve(value, hook)
}

#[cfg(test)]
mod tests;
