//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};
use warpline_shared::AppError;

/// Renders an error as `{ "error": code, "message": text }` with its HTTP status.
///
/// Server-side failures are logged with their detail and reported to the
/// client with a generic message.
pub fn error_response(err: impl Into<AppError>) -> Response {
    let err = err.into();
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_client_error() {
        warn!(error = %err, code = err.error_code(), "Request rejected");
    } else {
        error!(error = %err, code = err.error_code(), "Request failed");
    }

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.public_message(),
        })),
    )
        .into_response()
}

/// Shorthand for a 400 response with a validation message.
pub fn validation_error(message: impl Into<String>) -> Response {
    error_response(AppError::Validation(message.into()))
}
