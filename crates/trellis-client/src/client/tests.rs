//! Verb dispatch and target checks, driven through a mocked transport.

use std::time::Duration;

use mockall::{Sequence, mock};
use rstest::rstest;
use trellis_wire::hypermedia::{List, Waiter};
use trellis_wire::{Hyperlink, Response};

use super::*;
use crate::errors::TransportError;
use crate::proxy::{RemoteFunction, RemoteWaiter};

mock! {
    Wire {}
    impl Transport for Wire {
        fn exchange(&self, request: &Request) -> Result<Response, TransportError>;
    }
}

fn silent() -> Client<MockWire> {
    let mut wire = MockWire::new();
    wire.expect_exchange().never();
    Client::new(wire)
}

fn text(link: &Hyperlink) -> String {
    let tagged = link.to_tagged(&Registry::hypermedia()).expect("encode");
    codec::to_text(&Value::Tagged(tagged)).expect("text")
}

fn waiter_body(remaining: u32) -> String {
    text(&Hyperlink::Waiter(Waiter {
        url: format!("/countdown/wait?remaining={remaining}"),
    }))
}

fn page_body(items: Vec<Value>, continuation: Option<&str>) -> String {
    text(&Hyperlink::List(List {
        kind: "Job".to_owned(),
        collection: "/jobs".to_owned(),
        items,
        selector: "*".to_owned(),
        continuation: continuation.map(str::to_owned),
    }))
}

fn jobs() -> RemoteDataset {
    RemoteDataset::new(
        "Job".to_owned(),
        "/jobs".to_owned(),
        vec!["name".to_owned()],
        vec!["job".to_owned()],
        Some("name".to_owned()),
    )
}

fn service() -> RemoteObject {
    RemoteObject::new(
        "MathService".to_owned(),
        "/math".to_owned(),
        vec!["zero".to_owned()],
        BTreeMap::from([("add".to_owned(), vec!["a".to_owned(), "b".to_owned()])]),
        BTreeMap::from([("precision".to_owned(), Tree::data(64))]),
    )
}

fn page() -> RemoteList {
    RemoteList::new("Job".to_owned(), "/jobs".to_owned(), Vec::new(), "*".to_owned(), None)
}

#[rstest]
#[case::get_listing("get", Target::from(page()))]
#[case::get_data("get", Target::Data(Value::from(1)))]
#[case::get_post_action("get", Target::from(Request::new(Method::Post, "/echo")))]
#[case::post_link("post", Target::from(RemoteFunction::link("/math/zero".to_owned(), None)))]
#[case::post_dataset("post", Target::from(jobs()))]
#[case::call_dataset("call", Target::from(jobs()))]
#[case::create_object("create", Target::from(service()))]
#[case::lookup_url("lookup", Target::from("/jobs"))]
#[case::delete_service("delete", Target::from(service()))]
#[case::delete_dataset("delete", Target::from(jobs()))]
#[case::delete_list_url("delete_list", Target::from("/jobs/list"))]
#[case::list_object("list", Target::from(service()))]
fn mismatched_targets_never_reach_the_transport(#[case] verb: &str, #[case] target: Target) {
    let client = silent();
    let outcome = match verb {
        "get" => client.get(target),
        "post" => client.post(target, &Value::Null),
        "call" => client.call(target, &CallArgs::new()),
        "create" => client.create(target, &CallArgs::new()),
        "lookup" => client.lookup(target, "ada"),
        "delete" => client.delete(target),
        "delete_list" => client.delete_list(target, None),
        "list" => client.list(target, ListOptions::default()).map(|_| Tree::null()),
        other => panic!("no verb {other}"),
    };
    assert!(
        matches!(outcome, Err(ClientError::MethodMismatch { .. })),
        "{verb}: {outcome:?}"
    );
}

#[rstest]
fn update_and_watch_are_unimplemented() {
    let client = silent();
    assert!(matches!(
        client.update("/total", &CallArgs::new()),
        Err(ClientError::Unimplemented { verb: "update" })
    ));
    assert!(matches!(client.watch("/total"), Err(ClientError::Unimplemented { verb: "watch" })));
}

#[test]
fn attributes_are_not_callable() {
    let client = silent();
    let error = client
        .call_method(&service(), "precision", &CallArgs::new())
        .expect_err("attribute");
    assert!(matches!(error, ClientError::MethodMismatch { verb: "call_method", .. }));
}

#[test]
fn methods_post_their_bound_arguments() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .withf(|request| {
            request.method == Method::Post
                && request.url == "/math/add"
                && request.body.as_deref() == Some(r#"{"a":1,"b":2}"#)
        })
        .times(1)
        .returning(|_| Ok(Response::ok("3")));
    let client = Client::new(wire);

    let sum = client
        .call_method(&service(), "add", &CallArgs::new().arg(1).arg(2))
        .expect("sum");
    assert_eq!(sum, Tree::data(3));
}

#[test]
fn url_calls_post_named_arguments() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .withf(|request| request.url == "/echo" && request.body.as_deref() == Some(r#"{"value":"hi"}"#))
        .times(1)
        .returning(|_| Ok(Response::ok(r#""hi""#)));
    let client = Client::new(wire);

    let echoed = client
        .call("/echo", &CallArgs::new().named("value", "hi"))
        .expect("echo");
    assert_eq!(echoed, Tree::data("hi"));

    let error = client.call("/echo", &CallArgs::new().arg("hi")).expect_err("positional");
    assert!(matches!(error, ClientError::InvalidArgument { .. }));
}

#[test]
fn remote_faults_surface_with_their_kind() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .returning(|_| Ok(Response::with_status(404, "missing")));
    let client = Client::new(wire);
    let error = client.get("/nothing").expect_err("not found");
    assert!(matches!(error, ClientError::Remote { status: 404, .. }));
}

#[test]
fn waiting_polls_until_a_value_arrives() {
    let mut wire = MockWire::new();
    let mut sequence = Sequence::new();
    wire.expect_exchange()
        .withf(|request| request.url == "/countdown/wait?remaining=2")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(Response::ok(waiter_body(1))));
    wire.expect_exchange()
        .withf(|request| request.url == "/countdown/wait?remaining=1")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(Response::ok(r#""done""#)));
    let client = Client::new(wire);

    let waiter = RemoteWaiter::new("/countdown/wait?remaining=2".to_owned());
    let done = client
        .wait(waiter, &WaitPolicy::new(Duration::ZERO, 5))
        .expect("converged");
    assert_eq!(done, Tree::data("done"));
}

#[test]
fn waiting_gives_up_after_the_policy_allows() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .times(3)
        .returning(|_| Ok(Response::ok(waiter_body(9))));
    let client = Client::new(wire);

    let error = client
        .wait("/countdown/wait?remaining=9", &WaitPolicy::new(Duration::ZERO, 2))
        .expect_err("exhausted");
    assert!(matches!(error, ClientError::WaitExhausted { attempts: 2 }));
}

#[test]
fn non_waiters_are_returned_unchanged() {
    let client = silent();
    let value = client
        .wait(Target::Data(Value::from(7)), &WaitPolicy::new(Duration::ZERO, 1))
        .expect("value");
    assert_eq!(value, Tree::data(7));
}

#[test]
fn listings_fetch_pages_on_demand() {
    let mut wire = MockWire::new();
    wire.expect_exchange()
        .withf(|request| request.param("limit") == Some("2"))
        .times(3)
        .returning(|request| {
            Ok(Response::ok(match request.param("continue") {
                None => page_body(vec![Value::from(1), Value::from(2)], Some("2")),
                Some("2") => page_body(vec![Value::from(3), Value::from(4)], Some("4")),
                Some(_) => page_body(vec![Value::from(5)], None),
            }))
        });
    let client = Client::new(wire);

    let mut listing = client
        .list(jobs(), ListOptions::default().batch(2))
        .expect("first page");
    assert_eq!(listing.pages(), 1);
    let first: Vec<Reply> = listing.by_ref().take(2).collect::<Result<_, _>>().expect("items");
    assert_eq!(first, vec![Tree::data(1), Tree::data(2)]);
    assert_eq!(listing.pages(), 1);

    let rest: Vec<Reply> = listing.by_ref().collect::<Result<_, _>>().expect("items");
    assert_eq!(rest, vec![Tree::data(3), Tree::data(4), Tree::data(5)]);
    assert_eq!(listing.pages(), 3);
}

#[test]
fn a_failed_page_ends_the_listing() {
    let mut wire = MockWire::new();
    let mut sequence = Sequence::new();
    wire.expect_exchange()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(Response::ok(page_body(vec![Value::from(1)], Some("1")))));
    wire.expect_exchange()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Err(TransportError::Closed));
    let client = Client::new(wire);

    let mut listing = client.list(jobs(), ListOptions::default()).expect("first page");
    assert_eq!(listing.next().map(Result::ok), Some(Some(Tree::data(1))));
    assert!(matches!(listing.next(), Some(Err(ClientError::Transport(TransportError::Closed)))));
    assert!(listing.next().is_none());
}

#[test]
fn continued_listings_keep_their_selector() {
    let client = silent();
    let error = client
        .list(page(), ListOptions::default().selector(Selector::default()))
        .err()
        .expect("conflict");
    assert!(matches!(error, ClientError::InvalidArgument { .. }));

    let drained: Vec<_> = client.list(page(), ListOptions::default()).expect("resume").collect();
    assert!(drained.is_empty());
}

#[test]
fn configuration_seeds_the_policies() {
    let config = Config::default();
    assert_eq!(
        WaitPolicy::from_config(&config),
        WaitPolicy::new(config.poll_interval(), config.max_poll_attempts())
    );
    assert_eq!(ListOptions::from_config(&config).batch, Some(config.page_size()));
}
