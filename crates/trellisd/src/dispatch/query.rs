//! Query-string and path-segment encoding for server-built URLs.
//!
//! Token state and waiter state travel as query parameters whose values are
//! wire text, so they decode back to the same [`Value`]s.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use trellis_wire::{CodecError, Value, codec};
use url::form_urlencoded;

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encodes text for use as one path segment.
#[must_use]
pub fn segment(text: &str) -> String {
    utf8_percent_encode(text, SEGMENT).to_string()
}

/// Renders state entries as query pairs of wire text.
///
/// # Errors
///
/// Returns [`CodecError`] when a value cannot be printed.
pub fn encode_state(state: &BTreeMap<String, Value>) -> Result<Vec<(String, String)>, CodecError> {
    state
        .iter()
        .map(|(name, value)| codec::to_text(value).map(|text| (name.clone(), text)))
        .collect()
}

/// Reads a query value as wire text, falling back to a plain string.
#[must_use]
pub fn decode_value(text: &str) -> Value {
    codec::from_text(text).unwrap_or_else(|_| Value::from(text))
}

/// Appends `pairs` to `path` as a query string.
#[must_use]
pub fn with_query(path: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return path.to_owned();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{path}?{query}")
}
