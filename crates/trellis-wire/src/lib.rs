//! Wire layer of the Trellis hypermedia protocol.
//!
//! Everything that crosses the boundary between a Trellis server and its
//! clients is defined here:
//!
//! - [`Value`], the tagged-union data model, and its canonical text form in
//!   [`codec`];
//! - the [`Registry`] mapping application types to tags and back, with
//!   unknown tags preserved as opaque [`TaggedValue`]s;
//! - [`Tree`], which lets the server and the client interleave runtime
//!   objects with plain data and substitute them during encode and decode;
//! - the [`hypermedia`] vocabulary (links, forms, datasets, resources,
//!   listings, waiters, services and faults);
//! - the [`selector`] algebra used to filter collection listings;
//! - the transport [`envelope`]s.
//!
//! # Example
//!
//! ```
//! use trellis_wire::{Registry, Value, codec, hypermedia::Link};
//!
//! let registry = Registry::hypermedia();
//! let tagged = registry.encode(&Link::new("/echo")).expect("Link is registered");
//! let text = codec::to_text(&Value::Tagged(tagged)).expect("printable");
//! assert_eq!(text, r#"@Link {"url":"/echo"}"#);
//! ```

pub mod codec;
pub mod envelope;
mod errors;
mod fields;
pub mod hypermedia;
pub mod registry;
pub mod selector;
mod tree;
mod value;

pub use self::envelope::{Method, Request, Response};
pub use self::errors::{CodecError, SelectorError};
pub use self::fields::Fields;
pub use self::hypermedia::{ErrorKind, Hyperlink};
pub use self::registry::{Decoded, Known, Registry, WireType};
pub use self::selector::{Clause, Operator, Selector};
pub use self::tree::{Resolve, Substitute, Tree};
pub use self::value::{FromValue, TaggedValue, Value};
