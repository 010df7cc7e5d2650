//! Tenant switch handler.
//!
//! `POST /tenant/switch` records the user's organization selection as a
//! TTL-bounded context entry, which subsequent token issuance observes.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::config::TenantConfig;
use crate::http::error_response;
use crate::http::session::authenticated_session;
use crate::storage::TenantContextStorage;
use crate::tenant::context::TenantContextEntry;
use crate::tenant::guard::MembershipGuard;
use crate::token::jwt::JwtService;

/// State for the tenant switch endpoint.
#[derive(Clone)]
pub struct TenantState {
    /// Context entry storage.
    pub contexts: Arc<dyn TenantContextStorage>,
    /// Membership guard enforcing that users only switch into their orgs.
    pub guard: Arc<MembershipGuard>,
    /// JWT service validating browser sessions.
    pub jwt: Arc<JwtService>,
    /// Tenant configuration (context TTL).
    pub config: TenantConfig,
}

impl TenantState {
    /// Creates a new tenant state.
    #[must_use]
    pub fn new(
        contexts: Arc<dyn TenantContextStorage>,
        guard: Arc<MembershipGuard>,
        jwt: Arc<JwtService>,
        config: TenantConfig,
    ) -> Self {
        Self {
            contexts,
            guard,
            jwt,
            config,
        }
    }
}

/// Body of a tenant switch request.
#[derive(Debug, Deserialize)]
pub struct TenantSwitchRequest {
    /// The organization to switch to.
    pub org_id: String,
}

/// Response to a successful tenant switch.
#[derive(Debug, Serialize)]
pub struct TenantSwitchResponse {
    /// The now-active organization.
    pub org_id: String,

    /// The user's role in it.
    pub role: String,

    /// When the context entry stops being honored.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Handler for `POST /tenant/switch`.
///
/// Requires an authenticated browser session and membership in the target
/// organization. The written entry replaces any previous one for the user
/// (last writer wins).
pub async fn tenant_switch_handler(
    State(state): State<TenantState>,
    headers: HeaderMap,
    Json(request): Json<TenantSwitchRequest>,
) -> Response {
    let session = match authenticated_session(&headers, &state.jwt) {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let membership = match state
        .guard
        .require_member(&session.sub, &request.org_id)
        .await
    {
        Ok(membership) => membership,
        Err(e) => return error_response(&e),
    };

    let entry = TenantContextEntry::new(
        session.sub.clone(),
        request.org_id.clone(),
        state.config.context_ttl,
    );
    let expires_at = entry.expires_at;

    if let Err(e) = state.contexts.set(entry).await {
        return error_response(&e);
    }

    info!(
        user_id = %session.sub,
        org_id = %request.org_id,
        "tenant context switched"
    );

    (
        StatusCode::OK,
        Json(TenantSwitchResponse {
            org_id: request.org_id,
            role: membership.role.to_string(),
            expires_at,
        }),
    )
        .into_response()
}
