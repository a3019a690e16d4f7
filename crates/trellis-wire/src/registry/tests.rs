//! Unit tests for the tag registry.

use rstest::{fixture, rstest};

use super::*;
use crate::fields::Fields;
use crate::hypermedia::{Link, Waiter};

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

impl WireType for Point {
    fn to_payload(&self) -> Value {
        Fields::new().with("x", self.x).with("y", self.y).into_payload()
    }

    fn from_payload(payload: Value) -> Result<Self, CodecError> {
        let mut fields = Fields::from_payload(payload)?;
        Ok(Self {
            x: fields.take("x")?,
            y: fields.take("y")?,
        })
    }
}

#[derive(Debug)]
struct Unregistered;

impl WireType for Unregistered {
    fn to_payload(&self) -> Value {
        Value::Null
    }

    fn from_payload(_payload: Value) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

#[fixture]
fn registry() -> Registry {
    let mut r = Registry::new();
    r.add::<Point>("geo.Point").expect("register point");
    r
}

#[rstest]
fn registered_types_round_trip(registry: Registry) {
    let point = Point { x: 3, y: -4 };
    let tagged = registry.encode(&point).expect("encode");
    assert_eq!(tagged.name(), "geo.Point");
    let back: Point = registry.decode_as(tagged).expect("decode");
    assert_eq!(back, point);
}

#[rstest]
fn erased_encoding_dispatches_on_runtime_type(registry: Registry) {
    let point = Point { x: 1, y: 2 };
    let tagged = registry.encode_any(&point).expect("encode");
    let Decoded::Known(known) = registry.decode(tagged).expect("decode") else {
        panic!("expected a known instance");
    };
    assert_eq!(known.tag(), "geo.Point");
    assert_eq!(known.downcast::<Point>().expect("is a point"), point);
}

#[rstest]
fn unregistered_types_fail_to_encode(registry: Registry) {
    assert!(matches!(
        registry.encode(&Unregistered),
        Err(CodecError::InvalidTag { .. })
    ));
    assert!(matches!(
        registry.encode_any(&Unregistered),
        Err(CodecError::InvalidTag { .. })
    ));
}

#[rstest]
fn unknown_tags_decode_as_opaque_values(registry: Registry) {
    let tagged = TaggedValue::new("future.Shape", Value::from("payload")).expect("valid tag");
    let decoded = registry.decode(tagged.clone()).expect("decode");
    let Decoded::Opaque(opaque) = decoded else {
        panic!("expected opaque value");
    };
    assert_eq!(opaque, tagged);
    let re_encoded = registry.encode_any(&opaque).expect("opaque encodes as itself");
    assert_eq!(re_encoded, tagged);
}

#[rstest]
#[case("int")]
#[case("set")]
#[case("unknown")]
fn reserved_tags_are_rejected_everywhere(mut registry: Registry, #[case] tag: &str) {
    assert!(matches!(
        registry.add::<Unregistered>(tag),
        Err(CodecError::InvalidTag { .. })
    ));
    assert!(matches!(
        registry.decode_parts(tag, Value::Null),
        Err(CodecError::InvalidTag { .. })
    ));
}

#[rstest]
fn conflicting_bindings_are_rejected(mut registry: Registry) {
    let taken = registry
        .add::<Unregistered>("geo.Point")
        .expect_err("tag already taken");
    assert!(taken.to_string().contains("already bound"));
    let bound = registry
        .add::<Point>("geo.Other")
        .expect_err("type already bound");
    assert!(matches!(bound, CodecError::InvalidTag { .. }));
    registry
        .add::<Point>("geo.Point")
        .expect("re-registering the same pair is harmless");
}

#[rstest]
fn decode_as_checks_the_tag(registry: Registry) {
    let tagged = TaggedValue::new("geo.Other", Value::Null).expect("valid tag");
    assert!(matches!(
        registry.decode_as::<Point>(tagged),
        Err(CodecError::Mismatch { .. })
    ));
}

#[rstest]
fn malformed_payloads_name_the_missing_field(registry: Registry) {
    let payload = Fields::new().with("x", 1).into_payload();
    let err = registry
        .decode_parts("geo.Point", payload)
        .expect_err("y missing");
    assert_eq!(err, CodecError::missing_field("y"));
}

#[test]
fn hypermedia_registry_knows_the_vocabulary() {
    let registry = Registry::hypermedia();
    assert_eq!(registry.tag_for::<Link>(), Some("Link"));
    assert_eq!(registry.tag_for::<Waiter>(), Some("Waiter"));
    assert!(registry.contains("Fault"));
}
