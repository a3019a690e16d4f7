use std::collections::BTreeMap;

use rstest::{fixture, rstest};
use trellis_wire::{Value, selector};

use super::*;
use crate::dispatch::{Context, Interface, Reply};

#[derive(Debug)]
struct Item {
    name: String,
    size: i64,
}

impl Exposed for Item {
    fn interface() -> Interface {
        Interface::new("Item")
    }

    fn attributes(&self) -> Result<BTreeMap<String, Value>, DispatchError> {
        Ok(BTreeMap::from([
            ("name".to_owned(), Value::from(self.name.as_str())),
            ("size".to_owned(), Value::from(self.size)),
        ]))
    }

    fn call(&self, method: &str, _args: Args, _context: &Context<'_>) -> Result<Reply, DispatchError> {
        Err(DispatchError::not_found(method))
    }
}

impl Record for Item {
    fn schema() -> Schema {
        Schema {
            create: Params::new().required("name").optional("size", 1),
            selectors: vec!["name".to_owned(), "size".to_owned()],
            key: "name".to_owned(),
        }
    }

    fn key(&self) -> String {
        self.name.clone()
    }

    fn create(mut args: Args) -> Result<Self, DispatchError> {
        Ok(Self {
            name: args.take("name")?,
            size: args.take("size")?,
        })
    }
}

fn item(name: &str, size: i64) -> Item {
    Item {
        name: name.to_owned(),
        size,
    }
}

#[fixture]
fn store() -> MemoryStore<Item> {
    let store = MemoryStore::new();
    for (index, name) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
        let size = i64::try_from(index).expect("small index");
        store.insert(item(name, size)).expect("insert");
    }
    store
}

fn keys(page: &Page<Item>) -> Vec<&str> {
    page.records.iter().map(|record| record.name.as_str()).collect()
}

#[rstest]
fn pages_continue_after_the_last_key(store: MemoryStore<Item>) {
    let first = store.list(None, Some(2), None).expect("first page");
    assert_eq!(keys(&first), ["a", "b"]);
    assert_eq!(first.next.as_deref(), Some("b"));

    let second = store.list(None, Some(2), first.next.as_deref()).expect("second page");
    assert_eq!(keys(&second), ["c", "d"]);

    let last = store.list(None, Some(2), second.next.as_deref()).expect("last page");
    assert_eq!(keys(&last), ["e"]);
    assert!(last.next.is_none());
}

#[rstest]
fn a_full_final_page_carries_no_token(store: MemoryStore<Item>) {
    let page = store.list(None, Some(5), None).expect("page");
    assert_eq!(page.records.len(), 5);
    assert!(page.next.is_none());
}

#[rstest]
fn unlimited_listings_return_everything(store: MemoryStore<Item>) {
    let page = store.list(None, None, Some("b")).expect("page");
    assert_eq!(keys(&page), ["c", "d", "e"]);
    assert!(page.next.is_none());
}

#[rstest]
#[case("size>2", &["d", "e"])]
#[case("name in [\"a\", \"e\"]", &["a", "e"])]
#[case("size!=0", &["b", "c", "d", "e"])]
#[case("*", &["a", "b", "c", "d", "e"])]
fn selectors_filter_listings(store: MemoryStore<Item>, #[case] text: &str, #[case] expected: &[&str]) {
    let parsed = selector::parse(text).expect("selector");
    let page = store.list(parsed.as_ref(), None, None).expect("page");
    assert_eq!(keys(&page), expected);
}

#[rstest]
fn selector_pages_skip_non_matching_keys(store: MemoryStore<Item>) {
    let parsed = selector::parse("size!=1").expect("selector");
    let first = store.list(parsed.as_ref(), Some(2), None).expect("first");
    assert_eq!(keys(&first), ["a", "c"]);
    let second = store
        .list(parsed.as_ref(), Some(2), first.next.as_deref())
        .expect("second");
    assert_eq!(keys(&second), ["d", "e"]);
    assert!(second.next.is_none());
}

#[rstest]
fn lookups_and_deletes_report_missing_keys(store: MemoryStore<Item>) {
    assert_eq!(store.lookup("c").expect("c").size, 2);
    store.delete("c").expect("delete");
    assert_eq!(store.lookup("c").expect_err("gone"), StoreError::not_found("c"));
    assert_eq!(store.delete("c").expect_err("gone"), StoreError::not_found("c"));
}

#[rstest]
fn delete_matching_counts_removed_records(store: MemoryStore<Item>) {
    let parsed = selector::parse("size<2").expect("selector");
    assert_eq!(store.delete_matching(parsed.as_ref()).expect("delete"), 2);
    assert_eq!(store.len().expect("len"), 3);
    assert_eq!(store.delete_matching(None).expect("delete all"), 3);
    assert!(store.is_empty().expect("empty"));
}

#[rstest]
fn create_binds_defaults_and_rejects_duplicates(store: MemoryStore<Item>) {
    let body = Value::from(BTreeMap::from([("name".to_owned(), Value::from("f"))]));
    let args = Args::bind(&Item::schema().create, Some(body.clone())).expect("bind");
    let created = store.create(args).expect("create");
    assert_eq!(created.size, 1);

    let again = Args::bind(&Item::schema().create, Some(body)).expect("bind");
    let error = store.create(again).expect_err("duplicate");
    assert!(matches!(
        error,
        DispatchError::Store(StoreError::Conflict { .. })
    ));
}

#[rstest]
#[case::empty("")]
#[case::current(".")]
#[case::parent("..")]
#[case::private("_ada")]
fn unaddressable_keys_are_refused(store: MemoryStore<Item>, #[case] key: &str) {
    let error = store.insert(item(key, 1)).expect_err("unaddressable");
    assert_eq!(error, StoreError::UnaddressableKey { key: key.to_owned() });
    assert_eq!(store.len().expect("len"), 5);
}

#[rstest]
#[case("a b")]
#[case("a/b")]
#[case("x_")]
fn keys_needing_escapes_are_kept(store: MemoryStore<Item>, #[case] key: &str) {
    store.insert(item(key, 1)).expect("insert");
    assert_eq!(store.lookup(key).expect("lookup").name, key);
}
