//! Error types for statement parsing and result merging.

use thiserror::Error;

use crate::parser::ParseError;

/// Errors raised while parsing statements or merging partition pages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A clause did not match any recognized keyword or literal form.
    #[error("{0}")]
    Syntax(#[from] ParseError),

    /// A required clause is missing or two clauses disagree.
    #[error("invalid statement: {0}")]
    Validation(String),

    /// A `WITH` option the statement kind does not accept.
    #[error("unknown option '{key}' for {statement}")]
    UnknownOption {
        /// Statement kind, e.g. `INSERT`.
        statement: &'static str,
        /// Upper-cased option key.
        key: String,
    },

    /// Two mutually exclusive `WITH` options were both given.
    #[error("only one of {first} or {second} may be specified")]
    ConflictingOptions {
        /// First option name.
        first: String,
        /// Second option name.
        second: String,
    },

    /// An option was given a value it does not accept.
    #[error("invalid value '{value}' for option {key}")]
    InvalidOption {
        /// Upper-cased option key.
        key: String,
        /// Raw value as written.
        value: String,
    },

    /// A placeholder refers past the end of the argument list.
    #[error("invalid value index {index}: only {supplied} argument(s) supplied")]
    InvalidValueIndex {
        /// 1-based placeholder index.
        index: usize,
        /// Number of arguments supplied.
        supplied: usize,
    },

    /// A rewritten row or continuation payload has an unexpected shape.
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

impl CoreError {
    /// Shorthand for a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
