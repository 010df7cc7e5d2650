//! Authorization endpoint handler.
//!
//! `GET /oauth/authorize` starts the authorization code flow. An
//! unauthenticated request is redirected to the login page with a
//! `return_to` parameter; an authenticated one is validated and redirected
//! back to the client with a code.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use tracing::warn;

use crate::http::error_response;
use crate::http::session::maybe_session;
use crate::oauth::authorize::{AuthorizationRequest, AuthorizationService, AuthorizeContext};
use crate::token::jwt::JwtService;
use time::OffsetDateTime;

/// State for the authorization endpoint.
#[derive(Clone)]
pub struct AuthorizeState {
    /// Authorization service issuing codes.
    pub service: Arc<AuthorizationService>,
    /// JWT service validating browser sessions.
    pub jwt: Arc<JwtService>,
}

impl AuthorizeState {
    /// Creates a new authorize state.
    #[must_use]
    pub fn new(service: Arc<AuthorizationService>, jwt: Arc<JwtService>) -> Self {
        Self { service, jwt }
    }
}

/// Handler for `GET /oauth/authorize`.
pub async fn authorize_handler(
    State(state): State<AuthorizeState>,
    Query(request): Query<AuthorizationRequest>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let session = match maybe_session(&headers, &state.jwt) {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let Some(session) = session else {
        // Not logged in: bounce through the login page and come back
        return match state.service.login_redirect(&uri.to_string()) {
            Ok(url) => Redirect::to(url.as_str()).into_response(),
            Err(e) => error_response(&e),
        };
    };

    let context = AuthorizeContext {
        user_id: session.sub.clone(),
        active_org: session.active_org.clone(),
        auth_time: OffsetDateTime::from_unix_timestamp(session.auth_time)
            .unwrap_or_else(|_| OffsetDateTime::now_utc()),
    };

    match state.service.authorize(&request, &context).await {
        Ok(redirect) => Redirect::to(redirect.as_str()).into_response(),
        Err(e) => {
            warn!(client_id = %request.client_id, error = %e, "authorization request rejected");
            error_response(&e)
        }
    }
}
