//! Unit tests for the selector algebra.

use std::collections::BTreeMap;

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn record() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("name".to_owned(), Value::from("ada")),
        ("job".to_owned(), Value::from("foo")),
        ("size".to_owned(), Value::from(3)),
        ("weight".to_owned(), Value::from(2.5)),
    ])
}

#[rstest]
#[case::star("*")]
#[case::empty("")]
#[case::padded("  *  ")]
fn unconstrained_text_parses_to_none(#[case] text: &str) {
    assert_eq!(parse(text).expect("parse"), None);
}

#[test]
fn none_dumps_as_star() {
    assert_eq!(dump(None), "*");
    assert_eq!(dump(Some(&Selector::default())), "*");
}

#[rstest]
#[case("job==foo")]
#[case("job!=foo")]
#[case("size<3,size>1")]
#[case("size<=3,size>=1")]
#[case(r#"job in ["foo","bar"]"#)]
#[case("size notin [1,2]")]
#[case("owner,!deleted")]
#[case(r#"name=="two words""#)]
#[case(r#"flag=="true""#)]
#[case("when==@duration 1.5")]
fn canonical_text_round_trips(#[case] text: &str) {
    let selector = parse(text).expect("parse");
    assert_eq!(dump(selector.as_ref()), text);
}

#[rstest]
#[case("job == foo", "job==foo")]
#[case(r#"job=="foo""#, "job==foo")]
#[case("size>=0x10", "size>=16")]
#[case("colour in[\"red\"]", r#"colour in ["red"]"#)]
fn equivalent_spellings_normalise(#[case] text: &str, #[case] canonical: &str) {
    let selector = parse(text).expect("parse");
    assert_eq!(dump(selector.as_ref()), canonical);
}

#[test]
fn commas_inside_values_do_not_split_clauses() {
    let selector = parse(r#"job in ["a,b","c"],name=="x,y""#)
        .expect("parse")
        .expect("constrained");
    assert_eq!(selector.clauses().len(), 2);
    assert_eq!(selector.clauses()[1].value(), &Value::from("x,y"));
}

#[rstest]
#[case::missing_key("==foo")]
#[case::bad_operator("job~foo")]
#[case::bad_value("job==foo bar")]
#[case::in_needs_list("job in foo")]
#[case::empty_clause("job==foo,,size==1")]
fn malformed_selectors_are_rejected(#[case] text: &str) {
    assert!(parse(text).is_err(), "{text} should be rejected");
}

#[rstest]
#[case("job==foo", true)]
#[case("job==bar", false)]
#[case("job!=bar", true)]
#[case("size==3.0", true)]
#[case("weight>2", true)]
#[case("size<3", false)]
#[case("size<=3", true)]
#[case("name>=b", false)]
#[case("job in [\"foo\",\"bar\"]", true)]
#[case("job notin [\"foo\"]", false)]
#[case("missing!=1", true)]
#[case("missing notin [1]", true)]
#[case("missing==1", false)]
#[case("missing<1", false)]
#[case("name", true)]
#[case("!name", false)]
#[case("!missing", true)]
#[case("job==foo,size>5", false)]
fn clauses_match_record_attributes(
    record: BTreeMap<String, Value>,
    #[case] text: &str,
    #[case] expected: bool,
) {
    let selector = parse(text).expect("parse").expect("constrained");
    assert_eq!(selector.matches(&record), expected, "{text}");
}

#[test]
fn merge_concatenates_clauses() {
    let left = parse("job==foo").expect("parse");
    let right = parse("size>1").expect("parse");
    let merged = merge(left.clone(), right).expect("merged");
    assert_eq!(merged.to_string(), "job==foo,size>1");
    assert_eq!(merge(left.clone(), None), left);
    assert_eq!(merge(None, None), None);
}

#[test]
fn builders_validate_keys() {
    assert!(Clause::equals("job", "foo").is_ok());
    assert!(matches!(
        Clause::equals("bad key", 1),
        Err(SelectorError::InvalidKey { .. })
    ));
}
