//! Canonical printer for wire values.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;

use crate::errors::CodecError;
use crate::value::Value;

pub(crate) fn print(value: &Value, out: &mut String) -> Result<(), CodecError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Integer(number) => out.push_str(&number.to_string()),
        Value::Float(number) => print_float(*number, out),
        Value::Complex { re, im } => {
            out.push_str("@complex [");
            print_float(*re, out);
            out.push(',');
            print_float(*im, out);
            out.push(']');
        }
        Value::String(text) => print_string(text, out),
        Value::Bytes(bytes) => {
            out.push_str("@base64 ");
            print_string(&STANDARD.encode(bytes), out);
        }
        Value::Duration(span) => {
            out.push_str("@duration ");
            out.push_str(&format_seconds(*span));
        }
        Value::Datetime(instant) => {
            let text = instant
                .to_offset(UtcOffset::UTC)
                .format(&Rfc3339)
                .map_err(|error| CodecError::invalid_value(format!("datetime: {error}")))?;
            out.push_str("@datetime ");
            print_string(&text, out);
        }
        Value::Set(items) => {
            for (index, item) in items.iter().enumerate() {
                if items.iter().skip(index + 1).any(|other| other == item) {
                    return Err(CodecError::invalid_value("set contains duplicate items"));
                }
            }
            out.push_str("@set ");
            print_items(items, out)?;
        }
        Value::List(items) => print_items(items, out)?,
        Value::Map(entries) => {
            out.push('{');
            for (index, (key, item)) in entries.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                print_string(key, out);
                out.push(':');
                print(item, out)?;
            }
            out.push('}');
        }
        Value::Tagged(tagged) => {
            out.push('@');
            out.push_str(tagged.name());
            out.push(' ');
            print(tagged.payload(), out)?;
        }
    }
    Ok(())
}

fn print_items(items: &[Value], out: &mut String) -> Result<(), CodecError> {
    out.push('[');
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        print(item, out)?;
    }
    out.push(']');
    Ok(())
}

fn print_float(number: f64, out: &mut String) {
    if number.is_nan() {
        out.push_str("@float \"NaN\"");
    } else if number.is_infinite() {
        out.push_str(if number.is_sign_positive() {
            "@float \"+Infinity\""
        } else {
            "@float \"-Infinity\""
        });
    } else {
        // Debug keeps a fractional part or exponent, so floats stay floats.
        out.push_str(&format!("{number:?}"));
    }
}

fn print_string(text: &str, out: &mut String) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            ch if u32::from(ch) < 0x20 => out.push_str(&format!("\\u{:04x}", u32::from(ch))),
            ch => out.push(ch),
        }
    }
    out.push('"');
}

/// Exact decimal seconds with trailing zeros trimmed.
fn format_seconds(span: Duration) -> String {
    let nanos = span.subsec_nanos();
    if nanos == 0 {
        return span.as_secs().to_string();
    }
    let fraction = format!("{nanos:09}");
    format!("{}.{}", span.as_secs(), fraction.trim_end_matches('0'))
}
