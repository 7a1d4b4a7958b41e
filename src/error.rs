//! Error types for the Airtable client
//!
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Failures of a request against the API are normalized into [`ApiError`],
//! which carries a stable [`ErrorKind`] callers can branch on.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The main error type for the client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("An API key is required to connect to Airtable")]
    MissingApiKey,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Request Errors
    // ============================================================================
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Kind of the request failure, if this error came from a request
    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            Error::Api(e) => Some(&e.kind),
            _ => None,
        }
    }

    /// HTTP status of the failed response, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => e.status(),
            _ => None,
        }
    }

    /// Check if the server-side list iterator expired mid-traversal
    pub fn is_iterator_expired(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::ListRecordsIteratorNotAvailable))
    }

    /// Check if this error came from the transport rather than a response
    pub fn is_connection_error(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::ConnectionError))
    }
}

/// Result type alias for the client
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Classified request errors
// ============================================================================

/// Fixed vocabulary of request failure kinds.
///
/// Kinds reported by the server that are not part of the known set are kept
/// verbatim in [`ErrorKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AuthenticationRequired,
    NotAuthorized,
    NotFound,
    RequestTooLarge,
    UnprocessableEntity,
    TooManyRequests,
    ServerError,
    ServiceUnavailable,
    UnexpectedError,
    ConnectionError,
    /// The paging cursor of a list operation is no longer valid
    ListRecordsIteratorNotAvailable,
    Other(String),
}

impl ErrorKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ErrorKind::NotAuthorized => "NOT_AUTHORIZED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RequestTooLarge => "REQUEST_TOO_LARGE",
            ErrorKind::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            ErrorKind::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::UnexpectedError => "UNEXPECTED_ERROR",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::ListRecordsIteratorNotAvailable => "LIST_RECORDS_ITERATOR_NOT_AVAILABLE",
            ErrorKind::Other(kind) => kind,
        }
    }

    /// Parse a server-provided error type, ignoring case for known kinds
    pub fn from_type(raw: &str) -> Self {
        const KNOWN: [ErrorKind; 11] = [
            ErrorKind::AuthenticationRequired,
            ErrorKind::NotAuthorized,
            ErrorKind::NotFound,
            ErrorKind::RequestTooLarge,
            ErrorKind::UnprocessableEntity,
            ErrorKind::TooManyRequests,
            ErrorKind::ServerError,
            ErrorKind::ServiceUnavailable,
            ErrorKind::UnexpectedError,
            ErrorKind::ConnectionError,
            ErrorKind::ListRecordsIteratorNotAvailable,
        ];

        KNOWN
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_else(|| ErrorKind::Other(raw.to_string()))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request failure normalized from a final, non-retried outcome
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}{}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct ApiError {
    /// Stable kind for programmatic branching
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// HTTP status code, absent for transport failures
    pub status: Option<u16>,
    /// Parsed response body, when one was received
    pub body: Option<Value>,
}

impl ApiError {
    /// Create an error from a received response
    pub fn from_response(
        kind: ErrorKind,
        message: impl Into<String>,
        status: u16,
        body: Option<Value>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            status: Some(status),
            body,
        }
    }

    /// Create a transport-level failure
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ConnectionError,
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// HTTP status code of the response
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}
