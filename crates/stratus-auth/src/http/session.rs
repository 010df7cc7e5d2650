//! Browser session extraction.
//!
//! Interactive endpoints (authorize, device verify, tenant switch) require
//! an authenticated browser session. The session is a signed JWT issued by
//! the login system and presented as a bearer credential.

use axum::http::HeaderMap;
use axum::http::header;

use crate::error::AuthError;
use crate::token::jwt::{JwtService, SessionClaims};

/// Extracts and validates the session from the `Authorization` header.
///
/// # Errors
///
/// Returns `AuthError::Unauthorized` when the header is missing, malformed,
/// or carries an invalid or expired session token.
pub fn authenticated_session(
    headers: &HeaderMap,
    jwt: &JwtService,
) -> Result<SessionClaims, AuthError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AuthError::unauthorized("Missing Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::unauthorized("Expected a Bearer credential"))?;

    let data = jwt
        .decode::<SessionClaims>(token)
        .map_err(|e| AuthError::unauthorized(format!("Invalid session: {e}")))?;

    Ok(data.claims)
}

/// Like [`authenticated_session`], but absence of credentials is not an
/// error. Invalid credentials still are.
///
/// # Errors
///
/// Returns `AuthError::Unauthorized` only for present-but-invalid
/// credentials.
pub fn maybe_session(
    headers: &HeaderMap,
    jwt: &JwtService,
) -> Result<Option<SessionClaims>, AuthError> {
    if headers.get(header::AUTHORIZATION).is_none() {
        return Ok(None);
    }
    authenticated_session(headers, jwt).map(Some)
}
