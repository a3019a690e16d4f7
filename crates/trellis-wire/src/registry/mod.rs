//! Bidirectional tag registry.
//!
//! The [`Registry`] maps application tags to Rust types and back. Encoding
//! dispatches on the runtime type of a value; decoding dispatches on the tag
//! and falls back to an opaque [`TaggedValue`] for tags nobody registered, so
//! values from newer peers pass through untouched. Registries are plain values
//! built once at start-up and handed around by reference.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::codec::{is_reserved, validate_tag};
use crate::errors::CodecError;
use crate::hypermedia;
use crate::value::{TaggedValue, Value};

/// A type that travels on the wire under a registered tag.
pub trait WireType: Any + Send + Sync + Sized {
    /// Writes the value's fields as a payload.
    fn to_payload(&self) -> Value;

    /// Rebuilds a value from its payload.
    ///
    /// # Errors
    ///
    /// Returns a codec error when fields are missing or mistyped.
    fn from_payload(payload: Value) -> Result<Self, CodecError>;
}

type EncodeFn = fn(&(dyn Any + Send + Sync)) -> Option<Value>;
type DecodeFn = fn(Value) -> Result<Box<dyn Any + Send + Sync>, CodecError>;

#[derive(Clone, Copy)]
struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

fn encode_erased<T: WireType>(object: &(dyn Any + Send + Sync)) -> Option<Value> {
    object.downcast_ref::<T>().map(T::to_payload)
}

fn decode_erased<T: WireType>(payload: Value) -> Result<Box<dyn Any + Send + Sync>, CodecError> {
    let object: Box<dyn Any + Send + Sync> = Box::new(T::from_payload(payload)?);
    Ok(object)
}

/// Tag table shared by encoder and decoder.
#[derive(Clone, Default)]
pub struct Registry {
    by_tag: BTreeMap<String, Entry>,
    by_type: HashMap<TypeId, String>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.by_tag
                    .iter()
                    .map(|(tag, entry)| (tag.as_str(), entry.type_name)),
            )
            .finish()
    }
}

/// Result of decoding a tagged value.
#[derive(Debug)]
pub enum Decoded {
    /// The tag was registered and the payload rebuilt as its type.
    Known(Known),
    /// The tag is unknown to this registry.
    Opaque(TaggedValue),
}

/// A decoded instance of a registered type.
pub struct Known {
    tag: String,
    object: Box<dyn Any + Send + Sync>,
}

impl fmt::Debug for Known {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Known").field("tag", &self.tag).finish_non_exhaustive()
    }
}

impl Known {
    /// The tag the value arrived under.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns `true` when the instance is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.object.is::<T>()
    }

    /// Recovers the concrete instance, or hands the value back unchanged.
    ///
    /// # Errors
    ///
    /// Returns `self` when the instance is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let Self { tag, object } = self;
        object
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|object| Self { tag, object })
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the hypermedia vocabulary.
    #[must_use]
    pub fn hypermedia() -> Self {
        let mut registry = Self::new();
        hypermedia::register_vocabulary(&mut registry);
        registry
    }

    /// Binds `T` to `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTag`] when the tag is reserved or
    /// malformed, already bound to another type, or when `T` is already bound
    /// to another tag.
    pub fn add<T: WireType>(&mut self, tag: &str) -> Result<&mut Self, CodecError> {
        validate_tag(tag)?;
        if let Some(existing) = self.by_tag.get(tag) {
            if existing.type_id == TypeId::of::<T>() {
                return Ok(self);
            }
            return Err(CodecError::invalid_tag(
                tag,
                format!("already bound to {}", existing.type_name),
            ));
        }
        if let Some(existing) = self.by_type.get(&TypeId::of::<T>()) {
            return Err(CodecError::invalid_tag(
                tag,
                format!("{} is already bound to '{existing}'", type_name::<T>()),
            ));
        }
        self.insert::<T>(tag);
        Ok(self)
    }

    pub(crate) fn insert<T: WireType>(&mut self, tag: &str) {
        self.by_tag.insert(
            tag.to_owned(),
            Entry {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                encode: encode_erased::<T>,
                decode: decode_erased::<T>,
            },
        );
        self.by_type.insert(TypeId::of::<T>(), tag.to_owned());
    }

    /// Returns the tag bound to `T`.
    #[must_use]
    pub fn tag_for<T: Any>(&self) -> Option<&str> {
        self.tag_for_id(TypeId::of::<T>())
    }

    /// Returns the tag bound to a runtime type id.
    #[must_use]
    pub fn tag_for_id(&self, type_id: TypeId) -> Option<&str> {
        self.by_type.get(&type_id).map(String::as_str)
    }

    /// Returns `true` when `tag` is bound.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Encodes a registered value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTag`] when `T` is not registered.
    pub fn encode<T: WireType>(&self, object: &T) -> Result<TaggedValue, CodecError> {
        let tag = self
            .tag_for::<T>()
            .ok_or_else(|| CodecError::invalid_tag(type_name::<T>(), "type is not registered"))?;
        TaggedValue::new(tag, object.to_payload())
    }

    /// Encodes a type-erased value. An opaque [`TaggedValue`] encodes as
    /// itself.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTag`] when the runtime type is not
    /// registered.
    pub fn encode_any(&self, object: &(dyn Any + Send + Sync)) -> Result<TaggedValue, CodecError> {
        if let Some(opaque) = object.downcast_ref::<TaggedValue>() {
            return Ok(opaque.clone());
        }
        let erased: &dyn Any = object;
        let type_id = erased.type_id();
        let unregistered = || CodecError::invalid_tag("<erased>", "type is not registered");
        let tag = self.tag_for_id(type_id).ok_or_else(unregistered)?;
        let entry = self.by_tag.get(tag).ok_or_else(unregistered)?;
        let payload = (entry.encode)(object).ok_or_else(unregistered)?;
        TaggedValue::new(tag, payload)
    }

    /// Decodes a tag and payload pair.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidTag`] for reserved or malformed tags and
    /// the type's own error when a registered payload is malformed.
    pub fn decode_parts(&self, tag: &str, payload: Value) -> Result<Decoded, CodecError> {
        if is_reserved(tag) {
            return Err(CodecError::invalid_tag(tag, "tag name is reserved"));
        }
        self.decode(TaggedValue::new(tag, payload)?)
    }

    /// Decodes a tagged value, keeping unknown tags opaque.
    ///
    /// # Errors
    ///
    /// Returns the registered type's error when its payload is malformed.
    pub fn decode(&self, tagged: TaggedValue) -> Result<Decoded, CodecError> {
        if is_reserved(tagged.name()) {
            return Err(CodecError::invalid_tag(tagged.name(), "tag name is reserved"));
        }
        let Some(entry) = self.by_tag.get(tagged.name()) else {
            return Ok(Decoded::Opaque(tagged));
        };
        let (tag, payload) = tagged.into_parts();
        let object = (entry.decode)(payload)?;
        Ok(Decoded::Known(Known { tag, object }))
    }

    /// Decodes a tagged value that must be a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Mismatch`] when the tag is not the one bound to
    /// `T`, or the payload error.
    pub fn decode_as<T: WireType>(&self, tagged: TaggedValue) -> Result<T, CodecError> {
        let expected = self
            .tag_for::<T>()
            .ok_or_else(|| CodecError::invalid_tag(type_name::<T>(), "type is not registered"))?;
        if expected != tagged.name() {
            return Err(CodecError::Mismatch {
                expected: format!("@{expected}"),
                found: format!("@{}", tagged.name()),
            });
        }
        let (_, payload) = tagged.into_parts();
        T::from_payload(payload)
    }
}

#[cfg(test)]
mod tests;
