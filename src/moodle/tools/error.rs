use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads its inputs, calls the Moodle web services, or inspects their
/// responses.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The HTTP request could not be completed (connection refused, DNS,
    /// TLS, broken body stream, ...).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body was not a JSON document.
    #[error("could not decode Moodle response as JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// Moodle answered with an exception payload.
    #[error(transparent)]
    Remote(#[from] RemoteApiError),

    /// Raised when the named arguments of a call do not form a JSON object.
    #[error("invalid call arguments: {0}")]
    InvalidArguments(String),

    /// Raised when a response lacks a value at the requested path, or the
    /// value has the wrong shape.
    #[error("unexpected response at '{path}': expected {expected}")]
    UnexpectedResponse { path: String, expected: String },

    /// Raised when JSON parsing or serialization of local data fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the CSV reader.
    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a table file does not have the expected layout.
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// Raised when a required column is absent from a table.
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when no web service token was supplied.
    #[error("missing web service token, set the TOKEN environment variable or pass --token")]
    MissingToken,

    /// Raised when a `.env` file exists but cannot be parsed or read.
    #[error("could not load environment file: {0}")]
    Env(#[from] dotenvy::Error),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Wraps any transport-level failure.
    pub fn transport(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(error.into())
    }

    pub(crate) fn unexpected(path: &str, expected: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            path: path.to_string(),
            expected: expected.into(),
        }
    }
}

/// Exception reported by Moodle in place of a regular result.
///
/// Moodle signals failures with a JSON object such as
/// `{"exception": "invalid_parameter_exception", "errorcode": "invalidparameter",
/// "message": "..."}`. The whole object is kept so callers can inspect any
/// field, including `debuginfo` when the site has debugging enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteApiError {
    payload: Value,
}

impl RemoteApiError {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// The decoded error document, unchanged.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Exception class name, e.g. `invalid_parameter_exception`.
    pub fn exception(&self) -> Option<&str> {
        self.payload.get("exception").and_then(Value::as_str)
    }

    pub fn error_code(&self) -> Option<&str> {
        self.payload.get("errorcode").and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(Value::as_str)
    }
}

impl fmt::Display for RemoteApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error calling Moodle API")?;
        if let Some(exception) = self.exception() {
            write!(f, ": {exception}")?;
        }
        if let Some(message) = self.message() {
            write!(f, " ({message})")?;
        }
        if let Some(debug) = self.payload.get("debuginfo").and_then(Value::as_str) {
            write!(f, "\n{debug}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteApiError {}
