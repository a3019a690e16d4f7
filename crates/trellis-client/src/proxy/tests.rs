//! Request building for every proxy shape.

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn jobs() -> RemoteDataset {
    RemoteDataset::new(
        "Job".to_owned(),
        "/jobs".to_owned(),
        vec!["name".to_owned(), "job".to_owned()],
        vec!["name".to_owned(), "job".to_owned()],
        Some("name".to_owned()),
    )
}

#[fixture]
fn counter() -> RemoteObject {
    RemoteObject::new(
        "Counter".to_owned(),
        "/counter?count=3".to_owned(),
        vec!["value".to_owned()],
        BTreeMap::from([("increment".to_owned(), vec!["by".to_owned()])]),
        BTreeMap::from([("count".to_owned(), Tree::data(3))]),
    )
}

fn body(request: &Request) -> Value {
    codec::from_text(request.body.as_deref().expect("request body")).expect("wire text")
}

#[rstest]
fn members_prefer_attributes_then_links_then_methods(counter: RemoteObject) {
    assert_eq!(counter.member("count").expect("attribute"), Member::Attribute(Tree::data(3)));

    let Member::Link(value) = counter.member("value").expect("link") else {
        panic!("expected a link");
    };
    assert_eq!(value.method(), Method::Get);
    assert_eq!(value.url(), "/counter/value?count=3");

    let Member::Method(increment) = counter.member("increment").expect("method") else {
        panic!("expected a method");
    };
    assert_eq!(increment.method(), Method::Post);
    assert_eq!(increment.url(), "/counter/increment?count=3");
    assert_eq!(increment.arguments(), ["by".to_owned()]);
}

#[rstest]
fn unknown_members_name_the_kind(counter: RemoteObject) {
    let error = counter.member("missing").expect_err("unknown");
    assert!(matches!(
        error,
        ClientError::AttributeNotFound { ref kind, ref name } if kind == "Counter" && name == "missing"
    ));
}

#[test]
fn forms_bind_positionals_and_fill_defaults() {
    let add = RemoteFunction::form(
        "/math/add".to_owned(),
        vec!["a".to_owned(), "b".to_owned()],
        BTreeMap::from([("b".to_owned(), Value::from(0))]),
    );
    let request = add.action(&CallArgs::new().arg(2)).expect("bound");
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "/math/add");
    assert_eq!(
        body(&request),
        Value::Map(BTreeMap::from([
            ("a".to_owned(), Value::from(2)),
            ("b".to_owned(), Value::from(0)),
        ]))
    );
}

#[test]
fn links_take_no_arguments() {
    let link = RemoteFunction::link("/math/zero".to_owned(), None);
    assert_eq!(link.action(&CallArgs::new()).expect("plain get").method, Method::Get);
    let error = link.action(&CallArgs::new().arg(1)).expect_err("arguments");
    assert!(matches!(error, ClientError::InvalidArgument { .. }));
}

#[rstest]
fn predicates_leave_the_original_dataset_untouched(jobs: RemoteDataset) {
    let narrowed = jobs.where_eq("job", "foo").expect("narrowed");
    let twice = narrowed.where_not("name", "ada").expect("narrowed twice");

    assert_eq!(jobs.selector(), None);
    assert_eq!(selector::dump(narrowed.selector()), "job==foo");
    assert_eq!(selector::dump(twice.selector()), "job==foo,name!=ada");
}

#[rstest]
fn predicates_need_a_selector_field(jobs: RemoteDataset) {
    let error = jobs.where_eq("colour", "red").expect_err("not indexed");
    assert!(matches!(error, ClientError::InvalidArgument { .. }));
}

#[rstest]
fn builder_and_direct_selectors_conflict(jobs: RemoteDataset) {
    let narrowed = jobs.where_eq("job", "foo").expect("narrowed");
    let direct = selector::parse("name==ada").expect("parse");

    assert!(matches!(
        narrowed.list_action(direct.clone(), None),
        Err(ClientError::InvalidArgument { .. })
    ));
    assert!(matches!(
        narrowed.delete_list_action(direct.clone()),
        Err(ClientError::InvalidArgument { .. })
    ));
    let request = jobs.list_action(direct, Some(2)).expect("direct only");
    assert_eq!(request.param(WHERE_PARAM), Some("name==ada"));
    assert_eq!(request.param(LIMIT_PARAM), Some("2"));
}

#[rstest]
fn unconstrained_listings_send_match_all(jobs: RemoteDataset) {
    let request = jobs.delete_list_action(None).expect("match all");
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.url, "/jobs/list");
    assert_eq!(request.param(WHERE_PARAM), Some("*"));
    assert_eq!(request.param(LIMIT_PARAM), None);
}

#[rstest]
#[case::plain("ada", "/jobs/id/ada")]
#[case::spaced("two words", "/jobs/id/two%20words")]
#[case::slashed("a/b", "/jobs/id/a%2Fb")]
fn record_urls_encode_the_key(jobs: RemoteDataset, #[case] key: &str, #[case] url: &str) {
    assert_eq!(jobs.lookup_action(key).url, url);
    assert_eq!(jobs.delete_action(key).method, Method::Delete);
}

#[rstest]
fn creation_posts_to_the_new_suffix(jobs: RemoteDataset) {
    let request = jobs
        .create_action(&CallArgs::new().arg("ada").named("job", "foo"))
        .expect("bound");
    assert_eq!(request.url, "/jobs/new");
    assert_eq!(
        body(&request),
        Value::Map(BTreeMap::from([
            ("job".to_owned(), Value::from("foo")),
            ("name".to_owned(), Value::from("ada")),
        ]))
    );
}

#[test]
fn pages_continue_with_their_selector() {
    let page = RemoteList::new(
        "Job".to_owned(),
        "/jobs".to_owned(),
        Vec::new(),
        "job==foo".to_owned(),
        Some("2".to_owned()),
    );
    let next = page.next_action(Some(2)).expect("more pages");
    assert_eq!(next.url, "/jobs/list");
    assert_eq!(next.param(WHERE_PARAM), Some("job==foo"));
    assert_eq!(next.param(CONTINUE_PARAM), Some("2"));

    let last = RemoteList::new("Job".to_owned(), "/jobs".to_owned(), Vec::new(), "*".to_owned(), None);
    assert_eq!(last.next_action(Some(2)), None);
}

#[rstest]
fn only_collection_members_can_be_deleted(counter: RemoteObject) {
    assert!(matches!(
        counter.delete_action(),
        Err(ClientError::MethodMismatch { verb: "delete", .. })
    ));
    let record = RemoteObject::new(
        "Job".to_owned(),
        "/jobs/id/ada".to_owned(),
        Vec::new(),
        BTreeMap::new(),
        BTreeMap::new(),
    )
    .with_collection(Some("/jobs".to_owned()), Some("ada".to_owned()));
    let request = record.delete_action().expect("record");
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.url, "/jobs/id/ada");
}

#[test]
fn display_names_the_shape() {
    let waiter = Remote::Waiter(RemoteWaiter::new("/countdown/wait?remaining=2".to_owned()));
    assert_eq!(waiter.url(), "/countdown/wait?remaining=2");
    assert_eq!(
        Remote::Function(RemoteFunction::link("/echo".to_owned(), None)).to_string(),
        "function /echo"
    );
}
