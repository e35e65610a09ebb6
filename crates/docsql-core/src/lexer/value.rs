//! Scalar literal lexer shared by every statement that carries values.
//!
//! A literal is, in priority order, a placeholder (`$1`, `@1`, `:1`), `null`,
//! a JSON number, a JSON boolean, or a double-quoted string whose unquoted
//! content is itself decoded as JSON. That last form lets one syntax carry
//! strings (`"\"abc\""`), numbers (`"1.5"`), objects (`"{\"a\":1}"`) and
//! arrays.

use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};

use super::Span;
use crate::error::{CoreError, Result};
use crate::parser::ParseError;

/// A value position in a statement: either a literal or a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A string.
    String(String),
    /// A JSON array.
    Array(Vec<JsonValue>),
    /// A JSON object.
    Object(Map<String, JsonValue>),
    /// A 1-based positional placeholder.
    Placeholder(usize),
}

impl Literal {
    /// Converts a decoded JSON value into a literal.
    #[must_use]
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(a) => Self::Array(a),
            JsonValue::Object(o) => Self::Object(o),
        }
    }

    /// Returns the placeholder index, if this is a placeholder.
    #[must_use]
    pub const fn placeholder_index(&self) -> Option<usize> {
        match self {
            Self::Placeholder(index) => Some(*index),
            _ => None,
        }
    }

    /// Resolves the literal to a JSON value, substituting placeholders from `args`.
    pub fn resolve(&self, args: &[JsonValue]) -> Result<JsonValue> {
        Ok(match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(a) => JsonValue::Array(a.clone()),
            Self::Object(o) => JsonValue::Object(o.clone()),
            Self::Placeholder(index) => args
                .get(index.wrapping_sub(1))
                .cloned()
                .ok_or(CoreError::InvalidValueIndex {
                    index: *index,
                    supplied: args.len(),
                })?,
        })
    }
}

/// Highest placeholder index referenced by `literals`, or 0.
pub fn max_placeholder<'a>(literals: impl IntoIterator<Item = &'a Literal>) -> usize {
    literals
        .into_iter()
        .filter_map(Literal::placeholder_index)
        .max()
        .unwrap_or(0)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Matches `word` case-insensitively at the start of `input`, on a word boundary.
fn strip_word<'a>(input: &'a str, word: &str) -> Option<&'a str> {
    let head = input.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = &input[word.len()..];
    if rest.starts_with(is_word_char) {
        return None;
    }
    Some(rest)
}

/// Consumes trailing whitespace and at most one separator.
fn consume_trailer(rest: &str, separator: Option<char>) -> &str {
    let rest = rest.trim_start();
    match separator {
        Some(sep) => rest.strip_prefix(sep).unwrap_or(rest),
        None => rest,
    }
}

fn value_error(input: &str, reason: &str) -> CoreError {
    let found: String = input.chars().take(32).collect();
    let mut err = ParseError::unexpected("a value", found, Span::new(0, input.len()));
    if !reason.is_empty() {
        err.message = format!("{}: {reason}", err.message);
    }
    CoreError::Syntax(err)
}

fn scan_placeholder(input: &str) -> Option<(&str, &str)> {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, '$' | '@' | ':')) => {}
        _ => return None,
    }
    let end = input[1..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(input.len(), |i| i + 1);
    (end > 1).then(|| (&input[1..end], &input[end..]))
}

fn scan_number(input: &str) -> Option<(&str, &str)> {
    if !input.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return None;
    }
    let end = input
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | 'x' | 'X' | 'e' | 'E' | '+' | '-')))
        .unwrap_or(input.len());
    Some((&input[..end], &input[end..]))
}

/// Finds the closing quote of a double-quoted token, honoring backslash escapes.
fn scan_quoted(input: &str) -> Option<(&str, &str)> {
    if !input.starts_with('"') {
        return None;
    }
    let mut escaped = false;
    for (i, c) in input.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some((&input[..=i], &input[i + 1..])),
            _ => {}
        }
    }
    None
}

fn decode_quoted(token: &str) -> Result<Literal> {
    let unquoted: String = serde_json::from_str(token)
        .map_err(|e| value_error(token, &format!("cannot unquote: {e}")))?;
    let decoded: JsonValue = serde_json::from_str(&unquoted)
        .map_err(|e| value_error(token, &format!("cannot decode content as JSON: {e}")))?;
    Ok(Literal::from_json(decoded))
}

/// Parses one literal from the start of `input`.
///
/// Returns the literal and the remainder after trailing whitespace and an
/// optional `separator` have been consumed.
pub fn parse_value(input: &str, separator: Option<char>) -> Result<(Literal, &str)> {
    let input = input.trim_start();

    if let Some((digits, rest)) = scan_placeholder(input) {
        let index: usize = digits
            .parse()
            .map_err(|_| value_error(input, "placeholder index out of range"))?;
        if index == 0 {
            return Err(value_error(input, "placeholder index must be at least 1"));
        }
        return Ok((Literal::Placeholder(index), consume_trailer(rest, separator)));
    }

    if let Some(rest) = strip_word(input, "null") {
        return Ok((Literal::Null, consume_trailer(rest, separator)));
    }

    if let Some((token, rest)) = scan_number(input) {
        let number: Number = serde_json::from_str(token)
            .map_err(|e| value_error(input, &format!("invalid number \"{token}\": {e}")))?;
        return Ok((Literal::Number(number), consume_trailer(rest, separator)));
    }

    for (word, value) in [("true", true), ("false", false)] {
        if let Some(rest) = strip_word(input, word) {
            return Ok((Literal::Bool(value), consume_trailer(rest, separator)));
        }
    }

    if let Some((token, rest)) = scan_quoted(input) {
        let literal = decode_quoted(token)?;
        return Ok((literal, consume_trailer(rest, separator)));
    }

    Err(value_error(input, ""))
}

/// Like [`parse_value`], but also accepts an unquoted word (`[a-z0-9_./;:-]+`)
/// as a string, as allowed in a `DELETE ... WHERE` chain.
pub fn parse_value_or_word(input: &str, separator: Option<char>) -> Result<(Literal, &str)> {
    let trimmed = input.trim_start();
    match parse_value(trimmed, separator) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let end = trimmed
                .find(|c: char| {
                    !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | ';' | ':' | '-'))
                })
                .unwrap_or(trimmed.len());
            if end == 0 || trimmed.starts_with('"') {
                return Err(err);
            }
            let word = trimmed[..end].to_string();
            Ok((
                Literal::String(word),
                consume_trailer(&trimmed[end..], separator),
            ))
        }
    }
}
