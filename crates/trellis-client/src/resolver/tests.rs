//! Decoding replies into proxies.

use rstest::{fixture, rstest};
use trellis_wire::Method;
use trellis_wire::hypermedia::{Dataset, Form, Link, List, Resource, Waiter};

use super::*;

#[fixture]
fn registry() -> Registry {
    Registry::hypermedia()
}

fn wire(registry: &Registry, link: &Hyperlink) -> String {
    codec::to_text(&Value::Tagged(link.to_tagged(registry).expect("encode"))).expect("text")
}

fn decode(registry: &Registry, request_url: &str, response: &Response) -> Result<Reply, ClientError> {
    let request_base = Url::parse("http://trellis.invalid/")
        .and_then(|root| root.join(request_url))
        .expect("request url");
    decode_response(registry, request_base, response)
}

fn index(registry: &Registry) -> String {
    let echo = Hyperlink::Form(Form {
        url: "echo".to_owned(),
        arguments: vec!["value".to_owned()],
        defaults: BTreeMap::new(),
    });
    let jobs = Hyperlink::Dataset(Dataset {
        kind: "Job".to_owned(),
        url: "/api/jobs".to_owned(),
        create: vec!["name".to_owned()],
        selectors: vec!["job".to_owned()],
        key: Some("name".to_owned()),
    });
    let attributes = BTreeMap::from([
        ("echo".to_owned(), Value::Tagged(echo.to_tagged(registry).expect("form"))),
        ("jobs".to_owned(), Value::Tagged(jobs.to_tagged(registry).expect("dataset"))),
        ("version".to_owned(), Value::from(2)),
    ]);
    let members = Members::new(Vec::new(), BTreeMap::new(), attributes).expect("members");
    wire(registry, &Hyperlink::Resource(Resource::new("Index", "/api/", members)))
}

#[rstest]
fn an_index_resolves_to_nested_proxies(registry: Registry) {
    let reply = decode(&registry, "/api/", &Response::ok(index(&registry))).expect("decoded");
    let Some(Remote::Object(root)) = reply.into_object() else {
        panic!("expected an object");
    };
    assert_eq!(root.kind(), "Index");
    assert_eq!(root.url(), "/api/");
    assert_eq!(root.attribute("version"), Some(&Tree::data(2)));

    let Some(Tree::Object(Remote::Function(echo))) = root.attribute("echo") else {
        panic!("expected the echo form");
    };
    assert_eq!(echo.url(), "/api/echo");
    assert_eq!(echo.arguments(), ["value".to_owned()]);

    let Some(Tree::Object(Remote::Dataset(jobs))) = root.attribute("jobs") else {
        panic!("expected the jobs dataset");
    };
    assert_eq!(jobs.url(), "/api/jobs");
    assert_eq!(jobs.key_name(), Some("name"));
}

#[rstest]
fn listing_items_become_records(registry: Registry) {
    let record = Resource::new(
        "Job",
        "/jobs/id/ada",
        Members::new(Vec::new(), BTreeMap::new(), BTreeMap::new()).expect("members"),
    )
    .in_collection("/jobs", "ada");
    let item = Hyperlink::Resource(record).to_tagged(&registry).expect("record");
    let page = Hyperlink::List(List {
        kind: "Job".to_owned(),
        collection: "/jobs".to_owned(),
        items: vec![Value::Tagged(item)],
        selector: "job==foo".to_owned(),
        continuation: Some("1".to_owned()),
    });

    let reply = decode(&registry, "/jobs/list", &Response::ok(wire(&registry, &page))).expect("page");
    let Some(Remote::List(list)) = reply.into_object() else {
        panic!("expected a listing");
    };
    assert_eq!(list.continuation(), Some("1"));
    let [Tree::Object(Remote::Object(ada))] = list.items() else {
        panic!("expected one record, found {:?}", list.items());
    };
    assert_eq!(ada.collection(), Some("/jobs"));
    assert_eq!(ada.key(), Some("ada"));
}

#[rstest]
fn links_keep_their_cached_value(registry: Registry) {
    let link = Hyperlink::Link(Link {
        url: "/counter/value?count=3".to_owned(),
        value: Some(Value::from(3)),
    });
    let reply = decode(&registry, "/counter", &Response::ok(wire(&registry, &link))).expect("link");
    let Some(Remote::Function(function)) = reply.into_object() else {
        panic!("expected a function");
    };
    assert_eq!(function.cached(), Some(&Value::from(3)));
    assert_eq!(function.method(), Method::Get);
}

#[rstest]
fn waiters_resolve_against_the_request(registry: Registry) {
    let waiter = Hyperlink::Waiter(Waiter {
        url: "countdown/wait?remaining=2".to_owned(),
    });
    let reply = decode(&registry, "/api/countdown", &Response::ok(wire(&registry, &waiter))).expect("waiter");
    assert_eq!(reply.as_object().map(Remote::url), Some("/api/countdown/wait?remaining=2"));
}

#[rstest]
fn foreign_origins_stay_absolute(registry: Registry) {
    let link = Hyperlink::Link(Link::new("https://elsewhere.example/data"));
    let reply = decode(&registry, "/", &Response::ok(wire(&registry, &link))).expect("link");
    assert_eq!(reply.as_object().map(Remote::url), Some("https://elsewhere.example/data"));
}

#[rstest]
fn unknown_tags_stay_opaque(registry: Registry) {
    let reply = decode(&registry, "/", &Response::ok(r#"[@Colour "red", 1]"#)).expect("data");
    let colour = TaggedValue::new("Colour", Value::from("red")).expect("tag");
    assert_eq!(
        reply,
        Tree::Data(Value::List(vec![Value::Tagged(colour), Value::from(1)]))
    );
}

#[rstest]
#[case::no_content(Response::no_content())]
#[case::empty_ok(Response::ok(""))]
fn empty_replies_are_null(registry: Registry, #[case] response: Response) {
    assert!(decode(&registry, "/total/add", &response).expect("null").is_null());
}

#[rstest]
fn faults_become_remote_errors(registry: Registry) {
    let fault = Fault {
        kind: ErrorKind::Forbidden,
        message: "forbidden: _total".to_owned(),
    };
    let body = codec::to_text(&Value::Tagged(registry.encode(&fault).expect("fault"))).expect("text");
    let error = decode(&registry, "/total/_total", &Response::with_status(403, body)).expect_err("fault");
    assert_eq!(error.remote_kind(), Some(ErrorKind::Forbidden));
    assert!(matches!(error, ClientError::Remote { status: 403, ref message, .. } if message == "forbidden: _total"));
}

#[rstest]
fn bodies_without_a_fault_are_internal(registry: Registry) {
    let error = decode(&registry, "/", &Response::with_status(502, "bad gateway")).expect_err("status");
    assert!(matches!(
        error,
        ClientError::Remote { status: 502, kind: ErrorKind::Internal, ref message } if message == "bad gateway"
    ));
}
