//! Authorization endpoint service.
//!
//! Validates authorization requests, resolves the tenant for the
//! authenticated user, and issues single-use authorization codes bound to
//! a PKCE challenge.

use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, info};
use url::Url;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::code::{AuthorizationCode, generate_code};
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod};
use crate::storage::{AuthorizationCodeStorage, ClientStorage};
use crate::tenant::TenantResolver;
use crate::types::GrantType;

// =============================================================================
// Authorization Request
// =============================================================================

/// Query parameters of an authorization request.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code".
    pub response_type: String,

    /// Client identifier.
    pub client_id: String,

    /// Redirect URI, matched exactly against the registration.
    pub redirect_uri: String,

    /// Requested scope (space-separated).
    #[serde(default)]
    pub scope: Option<String>,

    /// Opaque client state, echoed back on the redirect.
    #[serde(default)]
    pub state: Option<String>,

    /// PKCE code challenge (S256 digest, base64url).
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE challenge method. Must be "S256".
    #[serde(default)]
    pub code_challenge_method: Option<String>,

    /// OIDC nonce, echoed into the ID token.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// The authenticated browser context an authorization request runs under.
#[derive(Debug, Clone)]
pub struct AuthorizeContext {
    /// The authenticated user.
    pub user_id: String,

    /// Organization active in the browser session, if any.
    pub active_org: Option<String>,

    /// When the user authenticated.
    pub auth_time: OffsetDateTime,
}

// =============================================================================
// Authorization Service
// =============================================================================

/// Issues authorization codes for authenticated browser sessions.
pub struct AuthorizationService {
    clients: Arc<dyn ClientStorage>,
    codes: Arc<dyn AuthorizationCodeStorage>,
    tenants: Arc<TenantResolver>,
    config: AuthConfig,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        codes: Arc<dyn AuthorizationCodeStorage>,
        tenants: Arc<TenantResolver>,
        config: AuthConfig,
    ) -> Self {
        Self {
            clients,
            codes,
            tenants,
            config,
        }
    }

    /// Processes an authorization request for an authenticated user.
    ///
    /// On success returns the redirect URL carrying `code` (and `state`).
    /// Validation failures that occur before the redirect URI is trusted
    /// (unknown client, unregistered redirect URI) are returned as errors;
    /// everything after that point could also be delivered by redirect,
    /// which the HTTP layer decides.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClient` for unknown or inactive clients,
    /// `AuthError::UnauthorizedClient` when the grant type or redirect URI
    /// is not registered for the client,
    /// `AuthError::InvalidRequest` for PKCE problems,
    /// `AuthError::UnsupportedResponseType` for anything but `code`, and
    /// `AuthError::InvalidScope` when the client may not request the scope.
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        context: &AuthorizeContext,
    ) -> Result<Url, AuthError> {
        let client = self
            .clients
            .find_by_id(&request.client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is disabled"));
        }

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized_client(
                "Client is not allowed the authorization code grant",
            ));
        }

        // The redirect URI must be trusted before anything is sent to it
        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::unauthorized_client("Unregistered redirect_uri"));
        }

        if request.response_type != "code" {
            return Err(AuthError::unsupported_response_type(&request.response_type));
        }

        // Public clients always use PKCE; confidential clients only when
        // registered with the requirement. A supplied challenge is always
        // validated and enforced at the exchange.
        let challenge = match request.code_challenge.as_deref() {
            Some(challenge_str) => {
                let method = request.code_challenge_method.as_deref().unwrap_or("S256");
                PkceChallengeMethod::parse(method)
                    .map_err(|e| AuthError::invalid_request(e.to_string()))?;
                Some(
                    PkceChallenge::new(challenge_str.to_string())
                        .map_err(|e| AuthError::invalid_request(e.to_string()))?,
                )
            }
            None if client.requires_pkce() => {
                return Err(AuthError::invalid_request(
                    "Missing parameter: code_challenge",
                ));
            }
            None => None,
        };

        let scope = request.scope.clone().unwrap_or_default();
        for s in scope.split_whitespace() {
            if !client.is_scope_allowed(s) {
                return Err(AuthError::invalid_scope(format!(
                    "Scope '{s}' is not allowed for this client"
                )));
            }
        }

        let resolved = self
            .tenants
            .resolve(&context.user_id, context.active_org.as_deref())
            .await?;

        let now = OffsetDateTime::now_utc();
        let record = AuthorizationCode {
            code: generate_code(),
            client_id: client.client_id.clone(),
            user_id: context.user_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scope,
            tenant_id: resolved.tenant_id.clone(),
            code_challenge: challenge.map(PkceChallenge::into_inner),
            nonce: request.nonce.clone(),
            auth_time: context.auth_time,
            expires_at: now + self.config.oauth.authorization_code_lifetime,
            created_at: now,
            consumed_at: None,
            issued_jti: None,
            issued_refresh_hash: None,
        };

        let code_value = record.code.clone();
        self.codes.store(record).await?;

        info!(
            client_id = %client.client_id,
            user_id = %context.user_id,
            tenant_id = %resolved.tenant_id,
            "authorization code issued"
        );

        let mut redirect = Url::parse(&request.redirect_uri)
            .map_err(|e| AuthError::invalid_request(format!("Invalid redirect_uri: {e}")))?;
        {
            let mut query = redirect.query_pairs_mut();
            query.append_pair("code", &code_value);
            if let Some(state) = &request.state {
                query.append_pair("state", state);
            }
        }

        debug!(redirect = %redirect, "authorization redirect built");
        Ok(redirect)
    }

    /// Builds the login redirect for an unauthenticated request.
    ///
    /// The user is sent to the login page with a `return_to` parameter so
    /// the flow resumes where it left off.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configured login URL does
    /// not parse.
    pub fn login_redirect(&self, return_to: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.config.login_url)
            .map_err(|e| AuthError::configuration(format!("Invalid login_url: {e}")))?;
        url.query_pairs_mut().append_pair("return_to", return_to);
        Ok(url)
    }
}
