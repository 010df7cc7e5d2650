//! Device authorization grant handlers (RFC 8628).
//!
//! Two endpoints: `POST /oauth/device_authorization` for devices starting
//! the flow, and `POST /oauth/device/verify` for the browser where the
//! user approves or denies.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::http::error_response;
use crate::http::session::authenticated_session;
use crate::oauth::device::{DeviceFlowService, DeviceVerdict};
use crate::token::jwt::JwtService;

/// State for the device flow endpoints.
#[derive(Clone)]
pub struct DeviceState {
    /// Device flow service.
    pub service: Arc<DeviceFlowService>,
    /// JWT service validating browser sessions (verify endpoint).
    pub jwt: Arc<JwtService>,
}

impl DeviceState {
    /// Creates a new device state.
    #[must_use]
    pub fn new(service: Arc<DeviceFlowService>, jwt: Arc<JwtService>) -> Self {
        Self { service, jwt }
    }
}

/// Body of a device authorization request.
#[derive(Debug, Deserialize)]
pub struct DeviceAuthorizationRequest {
    /// Client identifier.
    pub client_id: String,

    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Handler for `POST /oauth/device_authorization`.
pub async fn device_authorization_handler(
    State(state): State<DeviceState>,
    Form(request): Form<DeviceAuthorizationRequest>,
) -> Response {
    debug!(client_id = %request.client_id, "device authorization requested");

    match state
        .service
        .begin(&request.client_id, request.scope.as_deref())
        .await
    {
        Ok(response) => (
            StatusCode::OK,
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::PRAGMA, "no-cache"),
            ],
            Json(response),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Body of a device verification request.
#[derive(Debug, Deserialize)]
pub struct DeviceVerifyRequest {
    /// The code shown on the device, in any accepted formatting.
    pub user_code: String,

    /// The user's decision.
    pub verdict: DeviceVerdict,
}

/// Handler for `POST /oauth/device/verify`.
///
/// Requires an authenticated browser session. An approval binds the
/// device's tokens to the approver and their currently active tenant.
pub async fn device_verify_handler(
    State(state): State<DeviceState>,
    headers: HeaderMap,
    Form(request): Form<DeviceVerifyRequest>,
) -> Response {
    let session = match authenticated_session(&headers, &state.jwt) {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    match state
        .service
        .verify(
            &request.user_code,
            request.verdict,
            &session.sub,
            session.active_org.as_deref(),
        )
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "recorded" })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
