//! The wire value model.
//!
//! A [`Value`] is the tagged union every message is built from: primitives,
//! ordered sequences, key-ordered mappings and tagged values. Tagged values
//! whose tag is not registered anywhere survive decoding as an opaque
//! [`TaggedValue`], so unknown shapes still round-trip unchanged.

use std::collections::BTreeMap;
use std::time::Duration;

use time::OffsetDateTime;

use crate::codec::validate_tag;
use crate::errors::CodecError;

/// A decoded wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean primitive.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// IEEE 754 double.
    Float(f64),
    /// Complex number with real and imaginary parts.
    Complex {
        /// Real part.
        re: f64,
        /// Imaginary part.
        im: f64,
    },
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Non-negative span of time.
    Duration(Duration),
    /// Instant with a UTC offset.
    Datetime(OffsetDateTime),
    /// Sequence without duplicates.
    Set(Vec<Value>),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Mapping ordered by key.
    Map(BTreeMap<String, Value>),
    /// Application-defined value identified by its tag.
    Tagged(TaggedValue),
}

impl Value {
    /// Short name of the variant, used in mismatch diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Complex { .. } => "complex",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Duration(_) => "duration",
            Self::Datetime(_) => "datetime",
            Self::Set(_) => "set",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
            Self::Tagged(_) => "tagged",
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrows the text of a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(number) => Some(*number),
            _ => None,
        }
    }

    /// Borrows the entries of a mapping.
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Borrows the items of a list or set.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) | Self::Set(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Looks up a key in a mapping value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|entries| entries.get(key))
    }

    /// Builds a set, dropping later duplicates.
    #[must_use]
    pub fn set_of(items: impl IntoIterator<Item = Self>) -> Self {
        let mut unique: Vec<Self> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Self::Set(unique)
    }
}

/// A value carrying an application-defined tag.
///
/// The tag is validated on construction: it must be a well-formed tag name
/// and must not be one of the codec's reserved primitive tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    name: String,
    payload: Box<Value>,
}

impl TaggedValue {
    /// Creates a tagged value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTag`] when the name is reserved or
    /// malformed.
    pub fn new(name: impl Into<String>, payload: Value) -> Result<Self, CodecError> {
        let tag = name.into();
        validate_tag(&tag)?;
        Ok(Self {
            name: tag,
            payload: Box::new(payload),
        })
    }

    /// The tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The payload carried under the tag.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Splits the value into its tag and payload.
    #[must_use]
    pub fn into_parts(self) -> (String, Value) {
        (self.name, *self.payload)
    }
}

impl From<TaggedValue> for Value {
    fn from(tagged: TaggedValue) -> Self {
        Self::Tagged(tagged)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Self::Datetime(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<BTreeMap<String, T>> for Value {
    fn from(entries: BTreeMap<String, T>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect(),
        )
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Conversion out of a decoded [`Value`].
pub trait FromValue: Sized {
    /// Converts the value, failing with [`CodecError::Mismatch`] when the
    /// variant does not fit.
    ///
    /// # Errors
    ///
    /// Returns a mismatch error naming the expected and found variants.
    fn from_value(value: Value) -> Result<Self, CodecError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bool(flag) => Ok(flag),
            other => Err(CodecError::mismatch("bool", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Integer(number) => Ok(number),
            other => Err(CodecError::mismatch("integer", &other)),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Integer(number) => {
                Self::try_from(number).map_err(|_| CodecError::mismatch("non-negative integer", &value))
            }
            other => Err(CodecError::mismatch("non-negative integer", &other)),
        }
    }
}

impl FromValue for usize {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Integer(number) => {
                Self::try_from(number).map_err(|_| CodecError::mismatch("non-negative integer", &value))
            }
            other => Err(CodecError::mismatch("non-negative integer", &other)),
        }
    }
}

impl FromValue for f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "integers are accepted wherever a float is expected"
    )]
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Float(number) => Ok(number),
            Value::Integer(number) => Ok(number as Self),
            other => Err(CodecError::mismatch("float", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::String(text) => Ok(text),
            other => Err(CodecError::mismatch("string", &other)),
        }
    }
}

impl FromValue for Duration {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Duration(span) => Ok(span),
            other => Err(CodecError::mismatch("duration", &other)),
        }
    }
}

impl FromValue for OffsetDateTime {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Datetime(instant) => Ok(instant),
            other => Err(CodecError::mismatch("datetime", &other)),
        }
    }
}

impl FromValue for TaggedValue {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Tagged(tagged) => Ok(tagged),
            other => Err(CodecError::mismatch("tagged", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::List(items) | Value::Set(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(CodecError::mismatch("list", &other)),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, item)| T::from_value(item).map(|converted| (key, converted)))
                .collect(),
            other => Err(CodecError::mismatch("mapping", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_of_drops_duplicates() {
        let set = Value::set_of([Value::from(1), Value::from(2), Value::from(1)]);
        assert_eq!(set, Value::Set(vec![Value::from(1), Value::from(2)]));
    }

    #[test]
    fn tagged_value_rejects_reserved_names() {
        let result = TaggedValue::new("int", Value::from(1));
        assert!(matches!(result, Err(CodecError::InvalidTag { .. })));
    }

    #[test]
    fn option_treats_null_as_absent() {
        let absent: Option<i64> = FromValue::from_value(Value::Null).expect("null converts");
        assert_eq!(absent, None);
        let present: Option<i64> = FromValue::from_value(Value::from(3)).expect("int converts");
        assert_eq!(present, Some(3));
    }

    #[test]
    fn floats_accept_integers() {
        let number = f64::from_value(Value::from(2)).expect("integer widens");
        assert!((number - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mismatch_names_both_kinds() {
        let error = String::from_value(Value::from(true)).expect_err("bool is not a string");
        assert_eq!(error.to_string(), "expected string, found bool");
    }
}
