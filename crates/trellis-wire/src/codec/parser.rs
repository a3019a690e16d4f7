//! Recursive descent parser for the wire text syntax.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::{MAX_DEPTH, is_reserved, is_tag_char, is_tag_start};
use crate::errors::CodecError;
use crate::value::{TaggedValue, Value};

pub(crate) struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) const fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            depth: 0,
        }
    }

    /// Parses one value and requires nothing but trivia after it.
    pub(crate) fn document(mut self) -> Result<Value, CodecError> {
        let value = self.value()?;
        self.skip_trivia();
        if self.pos < self.text.len() {
            return Err(self.error("trailing characters after document"));
        }
        Ok(value)
    }

    fn value(&mut self) -> Result<Value, CodecError> {
        self.skip_trivia();
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let result = match self.peek() {
            Some('@') => self.tagged(),
            _ => self.literal(),
        };
        self.depth -= 1;
        result
    }

    fn tagged(&mut self) -> Result<Value, CodecError> {
        self.bump();
        let name = self.tag_name()?;
        if name == "duration" {
            return self.duration();
        }
        let payload = self.value()?;
        if is_reserved(name) {
            return builtin(name, payload);
        }
        Ok(Value::Tagged(TaggedValue::new(name, payload)?))
    }

    fn tag_name(&mut self) -> Result<&'a str, CodecError> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if is_tag_start(ch) => self.bump(),
            _ => return Err(self.error("expected tag name after '@'")),
        }
        while matches!(self.peek(), Some(ch) if is_tag_char(ch)) {
            self.bump();
        }
        self.slice(start)
    }

    fn duration(&mut self) -> Result<Value, CodecError> {
        self.skip_trivia();
        let span = if matches!(self.peek(), Some(ch) if ch == '-' || ch.is_ascii_digit()) {
            let start = self.pos;
            self.number()?;
            parse_seconds(self.slice(start)?)?
        } else {
            match self.value()? {
                Value::String(text) => parse_seconds(&text)?,
                Value::Duration(span) => span,
                other => return Err(CodecError::mismatch("duration seconds", &other)),
            }
        };
        Ok(Value::Duration(span))
    }

    fn literal(&mut self) -> Result<Value, CodecError> {
        match self.peek() {
            Some('{') => self.object(),
            Some('[') => self.list(),
            Some('"') => self.string().map(Value::String),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.number(),
            Some(ch) if ch.is_ascii_alphabetic() => self.keyword(),
            Some(ch) => Err(self.error(format!("unexpected character '{ch}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn keyword(&mut self) -> Result<Value, CodecError> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_alphanumeric() || ch == '_') {
            self.bump();
        }
        match self.slice(start)? {
            "null" => Ok(Value::Null),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            word => Err(CodecError::syntax(start, format!("unknown keyword '{word}'"))),
        }
    }

    fn number(&mut self) -> Result<Value, CodecError> {
        let start = self.pos;
        let negative = self.eat('-');
        if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.peek(), Some(ch) if ch.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = self.slice(digits_start)?;
            let magnitude = i128::from_str_radix(digits, 16)
                .map_err(|_| CodecError::syntax(start, "malformed hex integer"))?;
            let signed = if negative { -magnitude } else { magnitude };
            return i64::try_from(signed)
                .map(Value::Integer)
                .map_err(|_| CodecError::syntax(start, "integer out of range"));
        }
        if !self.digits() {
            return Err(self.error("expected digits"));
        }
        let mut is_float = false;
        if self.eat('.') {
            is_float = true;
            if !self.digits() {
                return Err(self.error("expected digits after decimal point"));
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !self.digits() {
                return Err(self.error("expected exponent digits"));
            }
        }
        let text = self.slice(start)?;
        if is_float {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| CodecError::syntax(start, "malformed float"))
        } else {
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| CodecError::syntax(start, "integer out of range"))
        }
    }

    fn digits(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.bump();
        }
        self.pos > start
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let start = self.pos;
        self.expect('"')?;
        let mut out = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(CodecError::syntax(start, "unterminated string"));
            };
            self.bump();
            match ch {
                '"' => return Ok(out),
                '\\' => out.push(self.escape()?),
                ch if u32::from(ch) < 0x20 => {
                    return Err(self.error("control character in string"));
                }
                ch => out.push(ch),
            }
        }
    }

    fn escape(&mut self) -> Result<char, CodecError> {
        let Some(ch) = self.peek() else {
            return Err(self.error("unterminated escape"));
        };
        self.bump();
        match ch {
            '"' => Ok('"'),
            '\\' => Ok('\\'),
            '/' => Ok('/'),
            'b' => Ok('\u{8}'),
            'f' => Ok('\u{c}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'u' => self.unicode_escape(),
            other => Err(self.error(format!("unknown escape '\\{other}'"))),
        }
    }

    fn unicode_escape(&mut self) -> Result<char, CodecError> {
        let high = self.hex4()?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if !self.rest().starts_with("\\u") {
                return Err(self.error("unpaired surrogate"));
            }
            self.pos += 2;
            let low = self.hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error("invalid low surrogate"));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn hex4(&mut self) -> Result<u32, CodecError> {
        let digits = self
            .rest()
            .get(..4)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("malformed unicode escape"))?;
        self.pos += 4;
        Ok(code)
    }

    fn list(&mut self) -> Result<Value, CodecError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat(']') {
                return Ok(Value::List(items));
            }
            items.push(self.value()?);
            self.skip_trivia();
            if !self.eat(',') {
                self.skip_trivia();
                self.expect(']')?;
                return Ok(Value::List(items));
            }
        }
    }

    fn object(&mut self) -> Result<Value, CodecError> {
        self.expect('{')?;
        let mut entries = BTreeMap::new();
        loop {
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Value::Map(entries));
            }
            let key_offset = self.pos;
            let key = self.string()?;
            self.skip_trivia();
            self.expect(':')?;
            let item = self.value()?;
            if entries.insert(key, item).is_some() {
                return Err(CodecError::syntax(key_offset, "duplicate key in object"));
            }
            self.skip_trivia();
            if !self.eat(',') {
                self.skip_trivia();
                self.expect('}')?;
                return Ok(Value::Map(entries));
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => self.bump(),
                Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or_default()
    }

    fn slice(&self, start: usize) -> Result<&'a str, CodecError> {
        self.text
            .get(start..self.pos)
            .ok_or_else(|| CodecError::syntax(start, "invalid character boundary"))
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), CodecError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}'")))
        }
    }

    fn error(&self, message: impl Into<String>) -> CodecError {
        CodecError::syntax(self.pos, message)
    }
}

/// Converts the payload of a reserved tag into its primitive variant.
fn builtin(name: &str, payload: Value) -> Result<Value, CodecError> {
    match (name, payload) {
        ("bool", Value::Bool(flag)) => Ok(Value::Bool(flag)),
        ("int", Value::Integer(number)) => Ok(Value::Integer(number)),
        ("int", Value::String(text)) => text
            .trim()
            .parse()
            .map(Value::Integer)
            .map_err(|_| CodecError::invalid_value(format!("'{text}' is not an integer"))),
        ("float", payload) => float(payload).map(Value::Float),
        ("complex", Value::List(parts)) => match <[Value; 2]>::try_from(parts) {
            Ok([re, im]) => Ok(Value::Complex {
                re: float(re)?,
                im: float(im)?,
            }),
            Err(_) => Err(CodecError::invalid_value("complex takes [re, im]")),
        },
        ("string", Value::String(text)) => Ok(Value::String(text)),
        ("bytestring", Value::String(text)) => text
            .chars()
            .map(|ch| u8::try_from(u32::from(ch)))
            .collect::<Result<Vec<u8>, _>>()
            .map(Value::Bytes)
            .map_err(|_| CodecError::invalid_value("bytestring holds a code point above 255")),
        ("base64", Value::String(text)) => STANDARD
            .decode(text.as_bytes())
            .map(Value::Bytes)
            .map_err(|error| CodecError::invalid_value(format!("bad base64: {error}"))),
        ("datetime", Value::String(text)) => OffsetDateTime::parse(&text, &Rfc3339)
            .map(Value::Datetime)
            .map_err(|error| CodecError::invalid_value(format!("bad datetime '{text}': {error}"))),
        ("set", Value::List(items) | Value::Set(items)) => {
            for (index, item) in items.iter().enumerate() {
                if items.iter().skip(index + 1).any(|other| other == item) {
                    return Err(CodecError::invalid_value("set contains duplicate items"));
                }
            }
            Ok(Value::Set(items))
        }
        ("list", Value::List(items)) => Ok(Value::List(items)),
        ("dict" | "object", Value::Map(entries)) => Ok(Value::Map(entries)),
        ("unknown", _) => Err(CodecError::invalid_tag(
            "unknown",
            "values of unknown type cannot be decoded",
        )),
        (tag, other) => Err(CodecError::mismatch(format!("payload for @{tag}"), &other)),
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "@float accepts integer payloads"
)]
fn float(payload: Value) -> Result<f64, CodecError> {
    match payload {
        Value::Float(number) => Ok(number),
        Value::Integer(number) => Ok(number as f64),
        Value::String(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "+Infinity" | "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| CodecError::invalid_value(format!("'{other}' is not a float"))),
        },
        other => Err(CodecError::mismatch("float", &other)),
    }
}

/// Parses decimal seconds exactly, without going through floating point.
fn parse_seconds(text: &str) -> Result<Duration, CodecError> {
    let invalid = || CodecError::invalid_value(format!("'{text}' is not a duration in seconds"));
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() || !whole.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > 9 || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    let secs: u64 = whole.parse().map_err(|_| invalid())?;
    let nanos: u32 = format!("{fraction:0<9}").parse().map_err(|_| invalid())?;
    Ok(Duration::new(secs, nanos))
}
