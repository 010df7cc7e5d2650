//! Token endpoint handler.
//!
//! `POST /oauth/token` with an `application/x-www-form-urlencoded` body.
//!
//! # Example
//!
//! ```ignore
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=https://app.example.com/callback
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! &client_id=my-app
//! ```

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::oauth::token::{TokenErrorCode, TokenErrorResponse, TokenRequest};
use crate::token::service::TokenService;

/// State for the token endpoint.
#[derive(Clone)]
pub struct TokenState {
    /// Token service executing grants.
    pub service: Arc<TokenService>,
}

impl TokenState {
    /// Creates a new token state.
    #[must_use]
    pub fn new(service: Arc<TokenService>) -> Self {
        Self { service }
    }
}

/// Handler for `POST /oauth/token`.
///
/// # Client Authentication
///
/// Clients authenticate with HTTP Basic (`Authorization: Basic
/// base64(client_id:client_secret)`), body parameters, or `client_id`
/// alone for public clients. Basic credentials take precedence over body
/// parameters.
pub async fn token_handler(
    State(state): State<TokenState>,
    headers: HeaderMap,
    Form(mut request): Form<TokenRequest>,
) -> Response {
    debug!(
        grant_type = %request.grant_type,
        client_id = ?request.client_id,
        "processing token request"
    );

    if let Err(e) = merge_basic_auth(&headers, &mut request) {
        warn!(error = %e, "malformed Basic credentials");
        return token_error_response(&e);
    }

    match state.service.exchange(&request).await {
        Ok(response) => (
            StatusCode::OK,
            // Token responses must never be cached (RFC 6749 Section 5.1)
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::PRAGMA, "no-cache"),
            ],
            Json(response),
        )
            .into_response(),
        Err(e) => {
            if e.is_server_error() {
                warn!(error = %e, category = %e.category(), "token request failed");
            } else if e.is_retryable() {
                // Routine device-flow polling, not a failure
                debug!(error = %e, "device client polling");
            } else {
                debug!(error = %e, category = %e.category(), "token request rejected");
            }
            token_error_response(&e)
        }
    }
}

/// Merges HTTP Basic credentials into the request body fields.
fn merge_basic_auth(headers: &HeaderMap, request: &mut TokenRequest) -> Result<(), AuthError> {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(());
    };

    let Some(encoded) = value.strip_prefix("Basic ") else {
        return Ok(());
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| AuthError::invalid_client("Malformed Basic credentials"))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| AuthError::invalid_client("Malformed Basic credentials"))?;

    let (client_id, client_secret) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::invalid_client("Malformed Basic credentials"))?;

    request.client_id = Some(client_id.to_string());
    request.client_secret = Some(client_secret.to_string());
    Ok(())
}

/// Maps an `AuthError` to the RFC 6749 / RFC 8628 error response.
fn token_error_response(err: &AuthError) -> Response {
    let body = TokenErrorResponse::from(err);
    let status = match body.error {
        TokenErrorCode::InvalidClient => StatusCode::UNAUTHORIZED,
        TokenErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };

    (
        status,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
        .into_response()
}
