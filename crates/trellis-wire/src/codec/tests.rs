//! Unit tests for the text codec.

use std::collections::BTreeMap;
use std::time::Duration;

use rstest::rstest;
use time::macros::datetime;

use super::*;
use crate::value::TaggedValue;

fn round_trip(value: &Value) -> Value {
    let text = to_text(value).expect("print");
    from_text(&text).unwrap_or_else(|error| panic!("parse {text}: {error}"))
}

#[rstest]
#[case::null(Value::Null)]
#[case::boolean(Value::Bool(true))]
#[case::negative(Value::Integer(-42))]
#[case::extreme(Value::Integer(i64::MIN))]
#[case::float(Value::Float(1.5))]
#[case::whole_float(Value::Float(3.0))]
#[case::tiny_float(Value::Float(1e-300))]
#[case::complex(Value::Complex { re: 1.0, im: -2.5 })]
#[case::escapes(Value::from("quote \" slash \\ tab \t nul \u{0} snow \u{2603} \u{1F600}"))]
#[case::bytes(Value::Bytes(vec![0, 1, 254, 255]))]
#[case::duration(Value::Duration(Duration::new(3, 250_000_000)))]
#[case::whole_duration(Value::Duration(Duration::from_secs(90)))]
#[case::datetime(Value::Datetime(datetime!(2024-05-01 12:30:00.5 UTC)))]
#[case::set(Value::Set(vec![Value::from(1), Value::from("a")]))]
#[case::nested(Value::List(vec![Value::Map(BTreeMap::from([("k".to_owned(), Value::Null)]))]))]
fn values_survive_printing(#[case] value: Value) {
    assert_eq!(round_trip(&value), value);
}

#[test]
fn opaque_tags_round_trip_unchanged() {
    let payload = Value::Map(BTreeMap::from([("x".to_owned(), Value::from(1))]));
    let tagged = Value::Tagged(TaggedValue::new("vendor.Widget", payload).expect("valid tag"));
    let text = to_text(&tagged).expect("print");
    assert_eq!(text, r#"@vendor.Widget {"x":1}"#);
    assert_eq!(from_text(&text).expect("parse"), tagged);
}

#[test]
fn non_finite_floats_use_float_tag() {
    assert_eq!(to_text(&Value::Float(f64::INFINITY)).expect("print"), r#"@float "+Infinity""#);
    let parsed = from_text(r#"@float "NaN""#).expect("parse");
    assert!(matches!(parsed, Value::Float(number) if number.is_nan()));
}

#[test]
fn datetimes_print_in_utc() {
    let local = datetime!(2024-05-01 14:30:00 +02:00);
    assert_eq!(
        to_text(&Value::Datetime(local)).expect("print"),
        r#"@datetime "2024-05-01T12:30:00Z""#
    );
}

#[rstest]
#[case::bool_tag("@bool true", Value::Bool(true))]
#[case::int_from_text(r#"@int "17""#, Value::Integer(17))]
#[case::hex("0x1F", Value::Integer(31))]
#[case::negative_hex("-0x10", Value::Integer(-16))]
#[case::float_from_int("@float 2", Value::Float(2.0))]
#[case::bytestring(r#"@bytestring "Aÿ""#, Value::Bytes(vec![65, 255]))]
#[case::duration_text(r#"@duration "0.001""#, Value::Duration(Duration::from_millis(1)))]
#[case::dict("@dict {}", Value::Map(BTreeMap::new()))]
#[case::object_tag("@object {}", Value::Map(BTreeMap::new()))]
#[case::explicit_list("@list [1]", Value::List(vec![Value::Integer(1)]))]
#[case::comments("[1, # one\n 2,]", Value::List(vec![Value::Integer(1), Value::Integer(2)]))]
#[case::surrogates(r#""\ud83d\ude00""#, Value::from("\u{1F600}"))]
fn reserved_and_extended_syntax_parses(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(from_text(text).expect("parse"), expected);
}

#[rstest]
#[case::unknown("@unknown null")]
#[case::reserved_misuse(r#"@set "a""#)]
fn reserved_tag_misuse_is_rejected(#[case] text: &str) {
    let error = from_text(text).expect_err("misuse");
    assert!(
        matches!(error, CodecError::InvalidTag { .. } | CodecError::Mismatch { .. }),
        "unexpected error {error:?}"
    );
}

#[test]
fn unknown_tag_is_always_invalid() {
    assert!(matches!(
        from_text("@unknown {}"),
        Err(CodecError::InvalidTag { tag, .. }) if tag == "unknown"
    ));
}

#[rstest]
#[case::trailing("1 2")]
#[case::unterminated(r#""abc"#)]
#[case::lone_surrogate(r#""\ud83d""#)]
#[case::duplicate_key(r#"{"a":1,"a":2}"#)]
#[case::overflow("9223372036854775808")]
#[case::bad_keyword("nil")]
#[case::dangling_tag("@")]
#[case::missing_colon(r#"{"a" 1}"#)]
fn malformed_text_is_a_syntax_error(#[case] text: &str) {
    assert!(matches!(from_text(text), Err(CodecError::Syntax { .. })));
}

#[test]
fn duplicate_set_members_are_rejected() {
    assert!(matches!(
        from_text("@set [1, 1]"),
        Err(CodecError::InvalidValue { .. })
    ));
    assert!(to_text(&Value::Set(vec![Value::Null, Value::Null])).is_err());
}

#[test]
fn negative_durations_are_rejected() {
    assert!(from_text("@duration -1").is_err());
}

#[test]
fn deep_nesting_is_bounded() {
    let text = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
    assert!(matches!(from_text(&text), Err(CodecError::Syntax { .. })));
}

#[rstest]
#[case("bool")]
#[case("dict")]
#[case("unknown")]
fn reserved_names_fail_validation(#[case] name: &str) {
    assert!(is_reserved(name));
    assert!(matches!(validate_tag(name), Err(CodecError::InvalidTag { .. })));
}

#[rstest]
#[case("")]
#[case("9lives")]
#[case("has space")]
fn malformed_names_fail_validation(#[case] name: &str) {
    assert!(validate_tag(name).is_err());
}
