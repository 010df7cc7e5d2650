//! JWKS endpoint handler.
//!
//! Provides `GET /.well-known/jwks.json` so resource servers can verify
//! token signatures offline.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::token::jwt::JwtService;

/// State for the JWKS endpoint.
#[derive(Clone)]
pub struct JwksState {
    /// JWT service holding the signing key.
    pub jwt: Arc<JwtService>,
}

impl JwksState {
    /// Creates a new JWKS state.
    #[must_use]
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

/// Handler for `GET /.well-known/jwks.json`.
pub async fn jwks_handler(State(state): State<JwksState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(state.jwt.jwks()),
    )
}
