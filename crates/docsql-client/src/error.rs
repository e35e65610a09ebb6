//! Error types for statement execution.

use docsql_core::CoreError;
use thiserror::Error;

use crate::rest::RestError;

/// Errors returned when executing or querying a statement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Parse, validation or merge error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database, collection or document does not exist.
    #[error("StatusCode=404 Not Found: {0}")]
    NotFound(String),

    /// The operation is not allowed on the target resource.
    #[error("StatusCode=403 Forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with existing data, e.g. a duplicated id or unique key.
    #[error("StatusCode=409 Conflict: {0}")]
    Conflict(String),

    /// The document changed since it was read.
    #[error("StatusCode=412 Precondition failure: {0}")]
    PreconditionFailed(String),

    /// Any other collaborator failure.
    #[error("StatusCode={status}: {message}")]
    Rest {
        /// HTTP status code.
        status: u16,
        /// The backend's message.
        message: String,
    },

    /// `exec` was called on a statement that returns rows.
    #[error("this operation is not supported, please use query")]
    ExecNotSupported,

    /// `query` was called on a statement that returns no rows.
    #[error("this operation is not supported, please use exec")]
    QueryNotSupported,

    /// The operation is not supported at all.
    #[error("this operation is not supported: {0}")]
    OperationNotSupported(String),

    /// Wrong number of arguments for a statement with a partition key.
    #[error("expected {inputs} or {with_pk} input values, got {got}")]
    PkArgumentCount {
        /// Placeholders in the statement.
        inputs: usize,
        /// Placeholders plus trailing partition key values.
        with_pk: usize,
        /// Arguments supplied.
        got: usize,
    },

    /// Wrong number of arguments.
    #[error("expected {expected} input values, got {got}")]
    ArgumentCount {
        /// Placeholders in the statement.
        expected: usize,
        /// Arguments supplied.
        got: usize,
    },

    /// A partition key value could not be derived from the statement.
    #[error("missing value for partition key {0}")]
    MissingPkValue(String),

    /// The continuation token could not be decoded or encoded.
    #[error("invalid continuation token: {0}")]
    InvalidContinuation(String),

    /// The client configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<RestError> for Error {
    fn from(err: RestError) -> Self {
        match err.status {
            403 => Self::Forbidden(err.message),
            404 => Self::NotFound(err.message),
            409 => Self::Conflict(err.message),
            412 => Self::PreconditionFailed(err.message),
            status => Self::Rest {
                status,
                message: err.message,
            },
        }
    }
}

/// Result type alias for execution.
pub type Result<T> = std::result::Result<T, Error>;
