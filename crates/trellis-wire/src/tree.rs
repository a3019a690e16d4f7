//! Values interleaved with runtime objects.
//!
//! Neither the server nor the client works with bare [`Value`]s at the edges:
//! the server returns application objects that must be substituted with
//! hypermedia on the way out, and the client turns hypermedia into proxies on
//! the way in. [`Tree`] carries those objects alongside plain data so the codec
//! stays ignorant of both.

use std::collections::BTreeMap;

use crate::errors::CodecError;
use crate::value::{TaggedValue, Value};

/// Plain data with runtime objects embedded at arbitrary depth.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree<O> {
    /// A subtree containing no objects.
    Data(Value),
    /// An ordered sequence with at least one object somewhere inside.
    Seq(Vec<Tree<O>>),
    /// A set with at least one object somewhere inside.
    Set(Vec<Tree<O>>),
    /// A mapping with at least one object somewhere inside.
    Map(BTreeMap<String, Tree<O>>),
    /// A runtime object.
    Object(O),
}

/// Encode-side hook: replaces runtime objects with wire values.
pub trait Substitute<O> {
    /// Error raised by the hook; codec failures must convert into it.
    type Error: From<CodecError>;

    /// Produces the wire value standing in for `object`.
    ///
    /// # Errors
    ///
    /// Returns an error when the object cannot be represented.
    fn substitute(&self, object: &O) -> Result<Value, Self::Error>;
}

/// Decode-side hook: claims application-tagged values.
pub trait Resolve<O> {
    /// Error raised by the hook; codec failures must convert into it.
    type Error: From<CodecError>;

    /// Turns a tagged value into a subtree. Returning
    /// `Tree::Data(Value::Tagged(tagged))` keeps the value opaque.
    ///
    /// # Errors
    ///
    /// Returns an error when the tagged value is malformed.
    fn resolve(&mut self, tagged: TaggedValue) -> Result<Tree<O>, Self::Error>;
}

impl<O> Tree<O> {
    /// Wraps plain data.
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data(value.into())
    }

    /// The "no value" tree.
    #[must_use]
    pub const fn null() -> Self {
        Self::Data(Value::Null)
    }

    /// Returns `true` when the tree is exactly [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Data(Value::Null))
    }

    /// Borrows the top-level object, if the tree is one.
    #[must_use]
    pub const fn as_object(&self) -> Option<&O> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Takes the top-level object, if the tree is one.
    pub fn into_object(self) -> Option<O> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Takes the plain data, if the tree holds no objects.
    pub fn into_data(self) -> Option<Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Builds a sequence, collapsing to plain data when nothing inside is an
    /// object.
    pub fn seq(items: Vec<Self>) -> Self {
        if items.iter().all(|item| matches!(item, Self::Data(_))) {
            Self::Data(Value::List(items.into_iter().filter_map(Self::into_data).collect()))
        } else {
            Self::Seq(items)
        }
    }

    /// Builds a set, collapsing to plain data when nothing inside is an
    /// object.
    pub fn set(items: Vec<Self>) -> Self {
        match Self::seq(items) {
            Self::Data(Value::List(plain)) => Self::Data(Value::Set(plain)),
            Self::Seq(items) => Self::Set(items),
            other => other,
        }
    }

    /// Builds a mapping, collapsing to plain data when nothing inside is an
    /// object.
    pub fn map(entries: BTreeMap<String, Self>) -> Self {
        if entries.values().all(|item| matches!(item, Self::Data(_))) {
            Self::Data(Value::Map(
                entries
                    .into_iter()
                    .filter_map(|(key, item)| item.into_data().map(|value| (key, value)))
                    .collect(),
            ))
        } else {
            Self::Map(entries)
        }
    }

    /// Replaces every object through `hook`, yielding plain data.
    ///
    /// # Errors
    ///
    /// Propagates the first substitution failure.
    pub fn render<S>(&self, hook: &S) -> Result<Value, S::Error>
    where
        S: Substitute<O>,
    {
        match self {
            Self::Data(value) => Ok(value.clone()),
            Self::Seq(items) => items
                .iter()
                .map(|item| item.render(hook))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Self::Set(items) => items
                .iter()
                .map(|item| item.render(hook))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Set),
            Self::Map(entries) => entries
                .iter()
                .map(|(key, item)| item.render(hook).map(|value| (key.clone(), value)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Map),
            Self::Object(object) => hook.substitute(object),
        }
    }

    /// Walks `value`, handing every application-tagged value to `hook`.
    ///
    /// # Errors
    ///
    /// Propagates the first resolution failure.
    pub fn resolve<R>(value: Value, hook: &mut R) -> Result<Self, R::Error>
    where
        R: Resolve<O>,
    {
        match value {
            Value::Tagged(tagged) => hook.resolve(tagged),
            Value::List(items) => {
                let resolved = items
                    .into_iter()
                    .map(|item| Self::resolve(item, hook))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::seq(resolved))
            }
            Value::Set(items) => {
                let resolved = items
                    .into_iter()
                    .map(|item| Self::resolve(item, hook))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::set(resolved))
            }
            Value::Map(entries) => {
                let resolved = entries
                    .into_iter()
                    .map(|(key, item)| Self::resolve(item, hook).map(|tree| (key, tree)))
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                Ok(Self::map(resolved))
            }
            other => Ok(Self::Data(other)),
        }
    }
}

impl<O> From<Value> for Tree<O> {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FromValue;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(i64);

    struct Markers;

    impl Substitute<Marker> for Markers {
        type Error = CodecError;

        fn substitute(&self, object: &Marker) -> Result<Value, CodecError> {
            Ok(TaggedValue::new("Marker", Value::from(object.0))?.into())
        }
    }

    impl Resolve<Marker> for Markers {
        type Error = CodecError;

        fn resolve(&mut self, tagged: TaggedValue) -> Result<Tree<Marker>, CodecError> {
            if tagged.name() == "Marker" {
                let (_, payload) = tagged.into_parts();
                Ok(Tree::Object(Marker(i64::from_value(payload)?)))
            } else {
                Ok(Tree::Data(Value::Tagged(tagged)))
            }
        }
    }

    #[test]
    fn objects_survive_render_and_resolve() {
        let tree = Tree::seq(vec![Tree::data(1), Tree::Object(Marker(7))]);
        let rendered = tree.render(&Markers).expect("render");
        let back = Tree::resolve(rendered, &mut Markers).expect("resolve");
        assert_eq!(back, tree);
    }

    #[test]
    fn object_free_sequences_collapse_to_data() {
        let tree: Tree<Marker> = Tree::seq(vec![Tree::data(1), Tree::data("two")]);
        assert_eq!(
            tree,
            Tree::Data(Value::List(vec![Value::from(1), Value::from("two")]))
        );
    }

    #[test]
    fn sets_holding_objects_stay_sets() {
        let tree = Tree::set(vec![Tree::data(1), Tree::Object(Marker(7))]);
        assert!(matches!(tree, Tree::Set(_)));

        let rendered = tree.render(&Markers).expect("render");
        assert!(matches!(rendered, Value::Set(_)), "{rendered:?}");
        let back = Tree::resolve(rendered, &mut Markers).expect("resolve");
        assert_eq!(back, tree);
    }

    #[test]
    fn object_free_sets_collapse_to_data() {
        let tree: Tree<Marker> = Tree::set(vec![Tree::data(1)]);
        assert_eq!(tree, Tree::Data(Value::Set(vec![Value::from(1)])));
    }

    #[test]
    fn opaque_tags_stay_data() {
        let opaque = TaggedValue::new("Other", Value::Null).expect("valid tag");
        let tree: Tree<Marker> =
            Tree::resolve(Value::Tagged(opaque.clone()), &mut Markers).expect("resolve");
        assert_eq!(tree, Tree::Data(Value::Tagged(opaque)));
    }
}
