//! Wire shapes of the hypermedia vocabulary.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::CodecError;
use crate::fields::Fields;
use crate::registry::WireType;
use crate::value::Value;

/// A URL, optionally with the value it currently resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Target URL.
    pub url: String,
    /// Cached value, when the server chose to inline it.
    pub value: Option<Value>,
}

impl Link {
    /// Creates a link without a cached value.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            value: None,
        }
    }
}

impl WireType for Link {
    fn to_payload(&self) -> Value {
        Fields::new()
            .with("url", &self.url)
            .with_optional("value", self.value.clone())
            .into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            url: fields.take("url")?,
            value: fields.take_optional("value")?,
        })
    }
}

/// A callable endpoint with named arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Form {
    /// Endpoint URL.
    pub url: String,
    /// Argument names in declaration order.
    pub arguments: Vec<String>,
    /// Values used for arguments the caller leaves out.
    pub defaults: BTreeMap<String, Value>,
}

impl WireType for Form {
    fn to_payload(&self) -> Value {
        Fields::new()
            .with("url", &self.url)
            .with("arguments", self.arguments.clone())
            .with("defaults", self.defaults.clone())
            .into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            url: fields.take("url")?,
            arguments: fields.take_or_default("arguments")?,
            defaults: fields.take_or_default("defaults")?,
        })
    }
}

/// Type-level descriptor of a keyed collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    /// Record kind name.
    pub kind: String,
    /// Collection base URL.
    pub url: String,
    /// Arguments accepted by `new`.
    pub create: Vec<String>,
    /// Attributes usable in selectors.
    pub selectors: Vec<String>,
    /// Name of the key attribute.
    pub key: Option<String>,
}

impl WireType for Dataset {
    fn to_payload(&self) -> Value {
        Fields::new()
            .with("kind", &self.kind)
            .with("url", &self.url)
            .with("create", self.create.clone())
            .with("selectors", self.selectors.clone())
            .with_optional("key", self.key.clone())
            .into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            kind: fields.take("kind")?,
            url: fields.take("url")?,
            create: fields.take_or_default("create")?,
            selectors: fields.take_or_default("selectors")?,
            key: fields.take_optional("key")?,
        })
    }
}

/// Safe links, methods and attributes of an embedded object.
///
/// The three name sets are pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Members {
    links: Vec<String>,
    methods: BTreeMap<String, Vec<String>>,
    attributes: BTreeMap<String, Value>,
}

impl Members {
    /// Validates and bundles the member tables.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidValue`] when a name appears in more than
    /// one table.
    pub fn new(
        links: Vec<String>,
        methods: BTreeMap<String, Vec<String>>,
        attributes: BTreeMap<String, Value>,
    ) -> Result<Self, CodecError> {
        let mut seen = BTreeSet::new();
        let names = links
            .iter()
            .chain(methods.keys())
            .chain(attributes.keys());
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(CodecError::invalid_value(format!(
                    "member '{name}' is declared more than once"
                )));
            }
        }
        Ok(Self {
            links,
            methods,
            attributes,
        })
    }

    /// Zero-argument methods invokable with GET.
    #[must_use]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Other methods with their argument names.
    #[must_use]
    pub const fn methods(&self) -> &BTreeMap<String, Vec<String>> {
        &self.methods
    }

    /// Attribute values.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    fn write(&self, fields: Fields) -> Fields {
        fields
            .with("links", self.links.clone())
            .with(
                "methods",
                self.methods
                    .iter()
                    .map(|(name, args)| (name.clone(), Value::from(args.clone())))
                    .collect::<BTreeMap<_, _>>(),
            )
            .with("attributes", self.attributes.clone())
    }

    fn read(fields: &mut Fields) -> Result<Self, CodecError> {
        Self::new(
            fields.take_or_default("links")?,
            fields.take_or_default("methods")?,
            fields.take_or_default("attributes")?,
        )
    }
}

/// An addressable object: a record, a singleton or a token view.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    kind: String,
    url: String,
    members: Members,
    collection: Option<String>,
    key: Option<String>,
}

impl Resource {
    /// Creates a resource that belongs to no collection.
    pub fn new(kind: impl Into<String>, url: impl Into<String>, members: Members) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
            members,
            collection: None,
            key: None,
        }
    }

    /// Records the enclosing collection and the record key.
    #[must_use]
    pub fn in_collection(mut self, collection: impl Into<String>, key: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self.key = Some(key.into());
        self
    }

    /// Kind name.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Absolute URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Links, methods and attributes.
    #[must_use]
    pub const fn members(&self) -> &Members {
        &self.members
    }

    /// URL of the enclosing collection.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Record key within the collection.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl WireType for Resource {
    fn to_payload(&self) -> Value {
        let fields = Fields::new()
            .with("kind", &self.kind)
            .with("url", &self.url)
            .with_optional("collection", self.collection.clone())
            .with_optional("key", self.key.clone());
        self.members.write(fields).into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            kind: fields.take("kind")?,
            url: fields.take("url")?,
            members: Members::read(&mut fields)?,
            collection: fields.take_optional("collection")?,
            key: fields.take_optional("key")?,
        })
    }
}

/// A stateless namespace of functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    kind: String,
    url: String,
    members: Members,
}

impl Service {
    /// Creates a service descriptor.
    pub fn new(kind: impl Into<String>, url: impl Into<String>, members: Members) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
            members,
        }
    }

    /// Kind name.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Absolute URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Links, methods and attributes.
    #[must_use]
    pub const fn members(&self) -> &Members {
        &self.members
    }
}

impl WireType for Service {
    fn to_payload(&self) -> Value {
        let fields = Fields::new()
            .with("kind", &self.kind)
            .with("url", &self.url);
        self.members.write(fields).into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            kind: fields.take("kind")?,
            url: fields.take("url")?,
            members: Members::read(&mut fields)?,
        })
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    /// Record kind name.
    pub kind: String,
    /// Collection base URL.
    pub collection: String,
    /// Records on this page.
    pub items: Vec<Value>,
    /// Selector text the page was produced with.
    pub selector: String,
    /// Cursor for the next page; absent on the last page.
    pub continuation: Option<String>,
}

impl WireType for List {
    fn to_payload(&self) -> Value {
        Fields::new()
            .with("kind", &self.kind)
            .with("collection", &self.collection)
            .with("items", Value::List(self.items.clone()))
            .with("selector", &self.selector)
            .with_optional("continue", self.continuation.clone())
            .into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            kind: fields.take("kind")?,
            collection: fields.take("collection")?,
            items: fields.take_or_default("items")?,
            selector: fields.take_optional("selector")?.unwrap_or_else(|| "*".to_owned()),
            continuation: fields.take_optional("continue")?,
        })
    }
}

/// A pending computation, resumed by fetching `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waiter {
    /// Continuation URL carrying the remaining state in its query string.
    pub url: String,
}

impl WireType for Waiter {
    fn to_payload(&self) -> Value {
        Fields::new().with("url", &self.url).into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            url: fields.take("url")?,
        })
    }
}
