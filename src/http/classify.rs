//! Response error classification
//!
//! Maps a final failed response to an [`ApiError`]. Error bodies look like
//! `{"error": {"type": "...", "message": "..."}}`; some endpoints send
//! `{"error": "TYPE"}` or put `type`/`message` at the top level.

use crate::error::{ApiError, ErrorKind};
use serde_json::Value;

const AUTHENTICATION_REQUIRED_MESSAGE: &str =
    "You should provide valid api key to perform this operation";
const NOT_AUTHORIZED_MESSAGE: &str = "You are not authorized to perform this operation";
const NOT_FOUND_MESSAGE: &str = "Could not find what you are looking for";
const REQUEST_TOO_LARGE_MESSAGE: &str = "Request body is too large";
const UNPROCESSABLE_ENTITY_MESSAGE: &str = "The operation cannot be processed";
const TOO_MANY_REQUESTS_MESSAGE: &str =
    "You have made too many requests in a short period of time. Please retry your request later";
const SERVER_ERROR_MESSAGE: &str = "Try again. If the problem persists, contact support.";
const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "The service is temporarily unavailable. Please retry shortly.";
const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";
const INVALID_RESPONSE_MESSAGE: &str =
    "The response from Airtable was invalid JSON. Please try again soon.";

/// Classify a failed response by status code and parsed body
pub fn classify(status: u16, body: Option<&Value>) -> ApiError {
    let (error_type, message) = body.map(error_fields).unwrap_or_default();
    let owned_body = body.cloned();

    let (kind, message) = match status {
        401 => (
            ErrorKind::AuthenticationRequired,
            AUTHENTICATION_REQUIRED_MESSAGE.to_string(),
        ),
        403 => (ErrorKind::NotAuthorized, NOT_AUTHORIZED_MESSAGE.to_string()),
        404 => (
            ErrorKind::NotFound,
            message.unwrap_or_else(|| NOT_FOUND_MESSAGE.to_string()),
        ),
        413 => (
            ErrorKind::RequestTooLarge,
            REQUEST_TOO_LARGE_MESSAGE.to_string(),
        ),
        422 => (
            error_type.map_or(ErrorKind::UnprocessableEntity, |t| ErrorKind::from_type(&t)),
            message.unwrap_or_else(|| UNPROCESSABLE_ENTITY_MESSAGE.to_string()),
        ),
        429 => (
            ErrorKind::TooManyRequests,
            TOO_MANY_REQUESTS_MESSAGE.to_string(),
        ),
        500 => (ErrorKind::ServerError, SERVER_ERROR_MESSAGE.to_string()),
        503 => (
            ErrorKind::ServiceUnavailable,
            SERVICE_UNAVAILABLE_MESSAGE.to_string(),
        ),
        _ => {
            let message = match (message, owned_body.is_some()) {
                (Some(message), _) => message,
                (None, true) => UNEXPECTED_ERROR_MESSAGE.to_string(),
                (None, false) => INVALID_RESPONSE_MESSAGE.to_string(),
            };
            (
                error_type.map_or(ErrorKind::UnexpectedError, |t| ErrorKind::from_type(&t)),
                message,
            )
        }
    };

    ApiError::from_response(kind, message, status, owned_body)
}

/// Extract `(type, message)` from an error body
fn error_fields(body: &Value) -> (Option<String>, Option<String>) {
    let text = |value: &Value, key: &str| value.get(key).and_then(Value::as_str).map(String::from);

    match body.get("error") {
        Some(error @ Value::Object(_)) => (text(error, "type"), text(error, "message")),
        Some(Value::String(error_type)) => (Some(error_type.clone()), text(body, "message")),
        // Flat bodies carry the fields at the top level
        _ => (text(body, "type"), text(body, "message")),
    }
}
