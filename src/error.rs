//! Module defining the errors which are exposed to the users of the crate

/// Errors aborting an upload, or failures of one of the collaborators which leave a chunk unacknowledged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The staged file ended before the first line terminator
    #[error("header not found")]
    HeaderNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The staging collaborator failed to persist or reopen the uploaded stream
    #[error("staging error: {0}")]
    Staging(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("bus error: {0}")]
    Bus(String),

    /// A bus payload which is not the `{data, header, fileId}` envelope
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid configuration — {variable}: {message}")]
    Config { variable: String, message: String },
}

/// Field-level failure of a single row. The row is dropped, the chunk continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("missing field: no header column matches {column}")]
    MissingColumn { column: &'static str },

    #[error("missing file id")]
    MissingFileId,

    /// The line is not valid delimited text
    #[error("unreadable row: {0}")]
    Unreadable(String),

    #[error("row length mismatch — file: {file_id}: expected {expected} fields, found {found}")]
    LengthMismatch {
        file_id: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid {field} — file: {file_id}, position: {position}: {value:?}")]
    InvalidValue {
        file_id: String,
        field: &'static str,
        value: String,
        position: usize,
    },
}

/// Failure reported by the billing or email provider for one debt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

pub(crate) fn store_error(message: impl Into<String>) -> Error {
    Error::Store(message.into())
}

pub(crate) fn bus_error(message: impl Into<String>) -> Error {
    Error::Bus(message.into())
}

pub(crate) fn staging_error(message: impl Into<String>) -> Error {
    Error::Staging(message.into())
}

pub(crate) fn config_error(variable: impl Into<String>, message: impl Into<String>) -> Error {
    Error::Config {
        variable: variable.into(),
        message: message.into(),
    }
}

pub(crate) fn invalid_value(
    file_id: &str,
    field: &'static str,
    value: &str,
    position: usize,
) -> RowError {
    RowError::InvalidValue {
        file_id: file_id.to_string(),
        field,
        value: value.to_string(),
        position,
    }
}
