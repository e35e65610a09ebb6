//! Parser error types.

use crate::lexer::Span;

/// A lexical or grammar error, carrying the text that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The location of the error within the parsed text.
    pub span: Span,
    /// Expected form (if applicable).
    pub expected: Option<String>,
    /// The offending text.
    pub found: Option<String>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
            found: None,
        }
    }

    /// Creates an "unexpected input" error.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        let expected: String = expected.into();
        let found: String = found.into();
        Self {
            message: format!("expected {expected}, found \"{found}\""),
            span,
            expected: Some(expected),
            found: Some(found),
        }
    }

    /// Creates an "unexpected end of input" error.
    #[must_use]
    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        let expected: String = expected.into();
        Self {
            message: format!("unexpected end of input: expected {expected}"),
            span,
            expected: Some(expected),
            found: None,
        }
    }

    /// Creates a "statement not recognized" error for the whole input.
    #[must_use]
    pub fn unrecognized(kind: &str, input: &str) -> Self {
        Self {
            message: format!("invalid {kind} statement: \"{}\"", input.trim()),
            span: Span::new(0, input.len()),
            expected: None,
            found: Some(input.trim().to_string()),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at position {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}
