//! Authorization server metadata handler (RFC 8414).
//!
//! Provides `GET /.well-known/oauth-authorization-server`.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::config::AuthConfig;

/// State for the discovery endpoint.
#[derive(Clone)]
pub struct DiscoveryState {
    /// Authorization configuration.
    pub config: AuthConfig,
}

impl DiscoveryState {
    /// Creates a new discovery state.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

/// Handler for `GET /.well-known/oauth-authorization-server`.
///
/// Returns the RFC 8414 metadata document describing the server's
/// endpoints and capabilities. All URLs derive from the configured issuer,
/// not the bind address.
pub async fn discovery_handler(State(state): State<DiscoveryState>) -> impl IntoResponse {
    let base = state.config.issuer.trim_end_matches('/');

    let doc = serde_json::json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/oauth/authorize"),
        "token_endpoint": format!("{base}/oauth/token"),
        "device_authorization_endpoint": format!("{base}/oauth/device_authorization"),
        "jwks_uri": format!("{base}/.well-known/jwks.json"),
        "scopes_supported": state.config.scopes_supported,
        "response_types_supported": ["code"],
        "grant_types_supported": [
            "authorization_code",
            "refresh_token",
            "urn:ietf:params:oauth:grant-type:device_code",
        ],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": [
            "none",
            "client_secret_basic",
            "client_secret_post",
        ],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": [state.config.signing.algorithm],
    });

    ([(header::CONTENT_TYPE, "application/json")], Json(doc))
}
