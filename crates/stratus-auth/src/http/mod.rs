//! HTTP handlers for the authorization endpoints.

pub mod authorize;
pub mod device;
pub mod discovery;
pub mod jwks;
pub mod session;
pub mod tenant;
pub mod token;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::AuthError;

/// Maps an `AuthError` to a generic JSON error response.
///
/// The token endpoint has its own mapping (RFC 6749 error bodies); this is
/// for every other endpoint.
pub(crate) fn error_response(err: &AuthError) -> Response {
    let status = match err {
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::Unauthorized { .. } | AuthError::InvalidClient { .. } => {
            StatusCode::UNAUTHORIZED
        }
        e if e.is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };

    // NotFound carries no description at all: a hidden cross-tenant
    // resource must serialize identically to a missing one.
    let body = if matches!(err, AuthError::NotFound) {
        serde_json::json!({ "error": "not_found" })
    } else if err.is_server_error() {
        serde_json::json!({
            "error": err.oauth_error_code(),
            "error_description": "Internal server error",
        })
    } else {
        serde_json::json!({
            "error": err.oauth_error_code(),
            "error_description": err.to_string(),
        })
    };

    (status, Json(body)).into_response()
}
