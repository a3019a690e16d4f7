//! Unit tests for the hypermedia vocabulary.

use std::collections::BTreeMap;

use rstest::{fixture, rstest};

use super::*;
use crate::codec::{from_text, to_text};
use crate::errors::CodecError;
use crate::registry::{Decoded, WireType};
use crate::value::{TaggedValue, Value};

#[fixture]
fn registry() -> Registry {
    Registry::hypermedia()
}

fn members() -> Members {
    Members::new(
        vec!["total".to_owned()],
        BTreeMap::from([("add".to_owned(), vec!["n".to_owned()])]),
        BTreeMap::from([("count".to_owned(), Value::from(3))]),
    )
    .expect("disjoint members")
}

fn through_text(registry: &Registry, tagged: TaggedValue) -> Hyperlink {
    let text = to_text(&Value::Tagged(tagged)).expect("print");
    let Value::Tagged(parsed) = from_text(&text).expect("parse") else {
        panic!("expected a tagged value in {text}");
    };
    let Decoded::Known(known) = registry.decode(parsed).expect("decode") else {
        panic!("expected a vocabulary tag in {text}");
    };
    Hyperlink::from_known(known).expect("hyperlink")
}

#[rstest]
fn resources_round_trip_through_text(registry: Registry) {
    let resource = Resource::new("Job", "/jobs/id/a", members()).in_collection("/jobs", "a");
    let tagged = registry.encode(&resource).expect("encode");
    assert_eq!(
        through_text(&registry, tagged),
        Hyperlink::Resource(resource)
    );
}

#[rstest]
fn lists_keep_their_continuation(registry: Registry) {
    let list = List {
        kind: "Job".to_owned(),
        collection: "/jobs".to_owned(),
        items: vec![Value::from(1)],
        selector: "job==foo".to_owned(),
        continuation: Some("b".to_owned()),
    };
    let tagged = registry.encode(&list).expect("encode");
    assert_eq!(
        tagged.payload().get("continue"),
        Some(&Value::from("b"))
    );
    assert_eq!(through_text(&registry, tagged), Hyperlink::List(list));
}

#[rstest]
fn optional_fields_are_omitted(registry: Registry) {
    let tagged = registry.encode(&Link::new("/echo")).expect("encode");
    assert_eq!(to_text(&Value::Tagged(tagged)).expect("print"), r#"@Link {"url":"/echo"}"#);
}

#[test]
fn overlapping_member_names_are_rejected() {
    let result = Members::new(
        vec!["total".to_owned()],
        BTreeMap::new(),
        BTreeMap::from([("total".to_owned(), Value::Null)]),
    );
    assert!(matches!(result, Err(CodecError::InvalidValue { .. })));
}

#[test]
fn decoding_validates_disjointness() {
    let payload = Value::Map(BTreeMap::from([
        ("kind".to_owned(), Value::from("T")),
        ("url".to_owned(), Value::from("/t")),
        ("links".to_owned(), Value::from(vec!["x"])),
        (
            "attributes".to_owned(),
            Value::Map(BTreeMap::from([("x".to_owned(), Value::Null)])),
        ),
    ]));
    assert!(Service::from_payload(payload).is_err());
}

#[rstest]
#[case(ErrorKind::NotFound, 404)]
#[case(ErrorKind::Forbidden, 403)]
#[case(ErrorKind::MethodNotAllowed, 405)]
#[case(ErrorKind::InvalidArgument, 400)]
#[case(ErrorKind::NotImplemented, 501)]
#[case(ErrorKind::Internal, 500)]
fn error_kinds_map_to_statuses(#[case] kind: ErrorKind, #[case] status: u16) {
    assert_eq!(kind.status(), status);
}

#[test]
fn unknown_fault_kinds_degrade_to_internal() {
    let payload = Value::Map(BTreeMap::from([
        ("kind".to_owned(), Value::from("Exploded")),
        ("message".to_owned(), Value::from("boom")),
    ]));
    let fault = Fault::from_payload(payload).expect("decode");
    assert_eq!(fault.kind, ErrorKind::Internal);
    assert_eq!(fault.message, "boom");
}

#[rstest]
fn faults_are_not_hyperlinks(registry: Registry) {
    let fault = Fault {
        kind: ErrorKind::Forbidden,
        message: "private".to_owned(),
    };
    let tagged = registry.encode(&fault).expect("encode");
    let Decoded::Known(known) = registry.decode(tagged).expect("decode") else {
        panic!("expected known fault");
    };
    let returned = Hyperlink::from_known(known).expect_err("not navigable");
    assert_eq!(returned.downcast::<Fault>().expect("fault"), fault);
}

#[rstest]
fn hyperlinks_encode_under_their_own_tag(registry: Registry) {
    let waiter = Hyperlink::Waiter(Waiter {
        url: "/countdown/wait?remaining=2".to_owned(),
    });
    let tagged = waiter.to_tagged(&registry).expect("encode");
    assert_eq!(tagged.name(), WAITER_TAG);
    assert_eq!(through_text(&registry, tagged), waiter);
}

#[test]
fn hyperlinks_need_the_vocabulary() {
    let link = Hyperlink::Link(Link::new("/echo"));
    assert!(matches!(
        link.to_tagged(&Registry::new()),
        Err(CodecError::InvalidTag { .. })
    ));
}
