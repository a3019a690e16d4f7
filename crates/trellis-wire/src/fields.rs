//! Helper for reading and writing the field mappings of tagged payloads.

use std::collections::BTreeMap;

use crate::errors::CodecError;
use crate::value::{FromValue, Value};

/// A tagged payload viewed as named fields.
///
/// Readers take fields out one at a time; fields nobody asks for are ignored
/// so newer peers may add fields without breaking older ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: BTreeMap<String, Value>,
}

impl Fields {
    /// Starts an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Views a payload as fields.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Mismatch`] when the payload is not a mapping.
    pub fn from_payload(payload: Value) -> Result<Self, CodecError> {
        match payload {
            Value::Map(entries) => Ok(Self { entries }),
            other => Err(CodecError::mismatch("mapping", &other)),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(name.to_owned(), value.into());
        self
    }

    /// Adds a field only when a value is present.
    #[must_use]
    pub fn with_optional<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(present) => self.with(name, present),
            None => self,
        }
    }

    /// Removes and converts a required field.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MissingField`] when absent, or the conversion
    /// error when the value has the wrong shape.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, CodecError> {
        let value = self
            .entries
            .remove(name)
            .ok_or_else(|| CodecError::missing_field(name))?;
        T::from_value(value)
    }

    /// Removes and converts an optional field; `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns the conversion error when a present value has the wrong shape.
    pub fn take_optional<T: FromValue>(&mut self, name: &str) -> Result<Option<T>, CodecError> {
        match self.entries.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::from_value(value).map(Some),
        }
    }

    /// Removes and converts a field, falling back to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns the conversion error when a present value has the wrong shape.
    pub fn take_or_default<T: FromValue + Default>(&mut self, name: &str) -> Result<T, CodecError> {
        self.take_optional(name).map(Option::unwrap_or_default)
    }

    /// Finishes writing and yields the payload mapping.
    #[must_use]
    pub fn into_payload(self) -> Value {
        Value::Map(self.entries)
    }
}
