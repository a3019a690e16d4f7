//! Selector algebra for filtering collection listings.
//!
//! A selector is an ordered conjunction of clauses. Its text form is a
//! comma-separated list of `key op value` clauses; `*` and the empty string
//! mean "match everything" and parse to `None`.
//!
//! ```text
//! job==foo,size>=3,colour in ["red","blue"],owner,!deleted
//! ```
//!
//! Clause values use the wire text syntax; a bare word that is not a keyword
//! or number reads as a string, so `job==foo` and `job=="foo"` are the same
//! clause.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use strum::{Display, EnumString};

use crate::codec::{from_text, to_text};
use crate::errors::{CodecError, SelectorError};
use crate::value::Value;

/// Text of the unconstrained selector.
pub const MATCH_ALL: &str = "*";

/// Comparison applied by a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Operator {
    /// `key==value`
    #[strum(serialize = "==")]
    Equals,
    /// `key!=value`
    #[strum(serialize = "!=")]
    NotEquals,
    /// `key<value`
    #[strum(serialize = "<")]
    LessThan,
    /// `key>value`
    #[strum(serialize = ">")]
    GreaterThan,
    /// `key<=value`
    #[strum(serialize = "<=")]
    LessEqualTo,
    /// `key>=value`
    #[strum(serialize = ">=")]
    GreaterEqualTo,
    /// `key in [values]`
    #[strum(serialize = "in")]
    In,
    /// `key notin [values]`
    #[strum(serialize = "notin")]
    NotIn,
    /// `key`
    #[strum(serialize = "exists")]
    Exists,
    /// `!key`
    #[strum(serialize = "!")]
    NotExists,
}

impl Operator {
    const fn takes_value(self) -> bool {
        !matches!(self, Self::Exists | Self::NotExists)
    }

    const fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

/// Symbolic operators, longest first so `<=` wins over `<`.
const SYMBOLS: [(&str, Operator); 6] = [
    ("==", Operator::Equals),
    ("!=", Operator::NotEquals),
    ("<=", Operator::LessEqualTo),
    (">=", Operator::GreaterEqualTo),
    ("<", Operator::LessThan),
    (">", Operator::GreaterThan),
];

/// One predicate over a record attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    key: String,
    operator: Operator,
    value: Value,
    value_text: String,
}

impl Clause {
    /// Creates a clause comparing `key` against `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::InvalidKey`] for keys outside the identifier
    /// set, [`SelectorError::ExpectedList`] when `in`/`notin` get a non-list,
    /// and [`SelectorError::InvalidValue`] when the value cannot be printed.
    pub fn new(key: &str, operator: Operator, value: Value) -> Result<Self, SelectorError> {
        if !is_key(key) {
            return Err(SelectorError::InvalidKey {
                key: key.to_owned(),
            });
        }
        if operator.takes_list() && value.as_items().is_none() {
            return Err(SelectorError::ExpectedList {
                clause: key.to_owned(),
                operator: operator.to_string(),
            });
        }
        let value_text = if operator.takes_value() {
            render_value(&value).map_err(|source| SelectorError::InvalidValue {
                clause: key.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Ok(Self {
            key: key.to_owned(),
            operator,
            value,
            value_text,
        })
    }

    /// Shorthand for an equality clause.
    ///
    /// # Errors
    ///
    /// See [`Clause::new`].
    pub fn equals(key: &str, value: impl Into<Value>) -> Result<Self, SelectorError> {
        Self::new(key, Operator::Equals, value.into())
    }

    /// Shorthand for an inequality clause.
    ///
    /// # Errors
    ///
    /// See [`Clause::new`].
    pub fn not_equals(key: &str, value: impl Into<Value>) -> Result<Self, SelectorError> {
        Self::new(key, Operator::NotEquals, value.into())
    }

    /// Attribute name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Comparison.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Operand; [`Value::Null`] for presence tests.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluates the clause against a record's attributes.
    #[must_use]
    pub fn matches(&self, attributes: &BTreeMap<String, Value>) -> bool {
        let actual = attributes.get(&self.key);
        match (self.operator, actual) {
            (Operator::Exists, found) => found.is_some(),
            (Operator::NotExists, found) => found.is_none(),
            (Operator::NotEquals | Operator::NotIn, None) => true,
            (_, None) => false,
            (Operator::Equals, Some(found)) => loosely_equal(found, &self.value),
            (Operator::NotEquals, Some(found)) => !loosely_equal(found, &self.value),
            (Operator::In, Some(found)) => self.contains(found),
            (Operator::NotIn, Some(found)) => !self.contains(found),
            (Operator::LessThan, Some(found)) => compare(found, &self.value) == Some(Ordering::Less),
            (Operator::GreaterThan, Some(found)) => {
                compare(found, &self.value) == Some(Ordering::Greater)
            }
            (Operator::LessEqualTo, Some(found)) => matches!(
                compare(found, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            (Operator::GreaterEqualTo, Some(found)) => matches!(
                compare(found, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    fn contains(&self, found: &Value) -> bool {
        self.value
            .as_items()
            .is_some_and(|items| items.iter().any(|item| loosely_equal(found, item)))
    }

    fn parse(text: &str) -> Result<Self, SelectorError> {
        let clause = text.trim();
        if let Some(negated) = clause.strip_prefix('!') {
            return Self::new(negated.trim(), Operator::NotExists, Value::Null);
        }
        let key_len = clause
            .find(|ch: char| !is_key_char(ch))
            .unwrap_or(clause.len());
        let (key, rest) = clause.split_at(key_len);
        if key.is_empty() {
            return Err(SelectorError::MissingKey {
                clause: clause.to_owned(),
            });
        }
        let remainder = rest.trim_start();
        if remainder.is_empty() {
            return Self::new(key, Operator::Exists, Value::Null);
        }
        let (operator, operand) = split_operator(remainder).ok_or_else(|| SelectorError::InvalidKey {
            key: clause.to_owned(),
        })?;
        let value = parse_operand(operand.trim()).map_err(|source| SelectorError::InvalidValue {
            clause: clause.to_owned(),
            source,
        })?;
        Self::new(key, operator, value).map_err(|error| match error {
            SelectorError::ExpectedList { operator: op, .. } => SelectorError::ExpectedList {
                clause: clause.to_owned(),
                operator: op,
            },
            other => other,
        })
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Exists => f.write_str(&self.key),
            Operator::NotExists => write!(f, "!{}", self.key),
            Operator::In | Operator::NotIn => {
                write!(f, "{} {} {}", self.key, self.operator, self.value_text)
            }
            symbolic => write!(f, "{}{}{}", self.key, symbolic, self.value_text),
        }
    }
}

/// An ordered conjunction of clauses.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector {
    clauses: Vec<Clause>,
}

impl Selector {
    /// Builds a selector from clauses.
    #[must_use]
    pub const fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// The clauses in order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns `true` when there are no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Appends a clause, returning the extended selector.
    #[must_use]
    pub fn with(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Appends every clause of `other`.
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// Returns `true` when every clause matches.
    #[must_use]
    pub fn matches(&self, attributes: &BTreeMap<String, Value>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(attributes))
    }

    /// Keys referenced by the selector, in clause order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(Clause::key)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str(MATCH_ALL);
        }
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

/// Parses selector text. `*`, the empty string and a clause-free text are
/// unconstrained and yield `None`.
///
/// # Errors
///
/// Returns a [`SelectorError`] describing the first malformed clause.
pub fn parse(text: &str) -> Result<Option<Selector>, SelectorError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == MATCH_ALL {
        return Ok(None);
    }
    let clauses = split_clauses(trimmed)
        .into_iter()
        .map(Clause::parse)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Selector::new(clauses)))
}

/// Prints a selector; `None` and empty selectors print as `*`.
#[must_use]
pub fn dump(selector: Option<&Selector>) -> String {
    selector.map_or_else(|| MATCH_ALL.to_owned(), Selector::to_string)
}

/// Combines two optional selectors into one conjunction.
#[must_use]
pub fn merge(first: Option<Selector>, second: Option<Selector>) -> Option<Selector> {
    match (first, second) {
        (Some(left), Some(right)) => Some(left.and(right)),
        (left, right) => left.or(right),
    }
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.')
}

fn is_key(key: &str) -> bool {
    key.chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && key.chars().all(is_key_char)
}

fn is_bare_word(text: &str) -> bool {
    is_key(text) && !matches!(text, "null" | "true" | "false")
}

fn split_operator(rest: &str) -> Option<(Operator, &str)> {
    if let Some((operator, operand)) = SYMBOLS
        .iter()
        .find_map(|&(symbol, operator)| rest.strip_prefix(symbol).map(|operand| (operator, operand)))
    {
        return Some((operator, operand));
    }
    [("notin", Operator::NotIn), ("in", Operator::In)]
        .into_iter()
        .find_map(|(word, operator)| {
            let operand = rest.strip_prefix(word)?;
            operand
                .starts_with(|ch: char| ch.is_whitespace() || ch == '[' || ch == '@')
                .then_some((operator, operand))
        })
}

fn parse_operand(text: &str) -> Result<Value, CodecError> {
    if is_bare_word(text) {
        return Ok(Value::String(text.to_owned()));
    }
    from_text(text)
}

fn render_value(value: &Value) -> Result<String, CodecError> {
    match value {
        Value::String(text) if is_bare_word(text) => Ok(text.clone()),
        other => to_text(other),
    }
}

/// Splits on commas that are not inside strings, lists or mappings.
fn split_clauses(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (offset, ch) in text.char_indices() {
        if in_string {
            match (escaped, ch) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push(text.get(start..offset).unwrap_or_default());
                start = offset + 1;
            }
            _ => {}
        }
    }
    pieces.push(text.get(start..).unwrap_or_default());
    pieces
}

#[expect(
    clippy::cast_precision_loss,
    reason = "mixed integer and float comparisons widen the integer"
)]
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(number) => Some(*number as f64),
        Value::Float(number) => Some(*number),
        _ => None,
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => {
            compare(left, right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
        (Value::Datetime(a), Value::Datetime(b)) => Some(a.cmp(b)),
        _ => as_float(left)?.partial_cmp(&as_float(right)?),
    }
}

#[cfg(test)]
mod tests;
