//! HTTP server assembly: router, middleware, and the serve loop.

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use stratus_auth::http::authorize::authorize_handler;
use stratus_auth::http::device::{device_authorization_handler, device_verify_handler};
use stratus_auth::http::discovery::discovery_handler;
use stratus_auth::http::jwks::jwks_handler;
use stratus_auth::http::tenant::tenant_switch_handler;
use stratus_auth::http::token::token_handler;

use crate::bootstrap::AppState;

/// Builds the application router.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(
            Router::new()
                .route("/oauth/authorize", get(authorize_handler))
                .with_state(state.authorize),
        )
        .merge(
            Router::new()
                .route("/oauth/token", post(token_handler))
                .with_state(state.token),
        )
        .merge(
            Router::new()
                .route(
                    "/oauth/device_authorization",
                    post(device_authorization_handler),
                )
                .route("/oauth/device/verify", post(device_verify_handler))
                .with_state(state.device),
        )
        .merge(
            Router::new()
                .route("/tenant/switch", post(tenant_switch_handler))
                .with_state(state.tenant),
        )
        .merge(
            Router::new()
                .route(
                    "/.well-known/oauth-authorization-server",
                    get(discovery_handler),
                )
                .with_state(state.discovery),
        )
        .merge(
            Router::new()
                .route("/.well-known/jwks.json", get(jwks_handler))
                .with_state(state.jwks),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

/// A bound, ready-to-run server.
pub struct StratusServer {
    addr: SocketAddr,
    app: Router,
}

impl StratusServer {
    /// Creates a server from a wired application state.
    #[must_use]
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: build_app(state),
        }
    }

    /// Binds the listener and serves until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error when binding or serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::build_state;
    use crate::config::ServerConfig;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let state = build_state(&ServerConfig::default()).await.unwrap();
        build_app(state)
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_discovery_document() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/.well-known/oauth-authorization-server")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc["issuer"], "http://localhost:8080");
        assert_eq!(doc["code_challenge_methods_supported"][0], "S256");
        assert_eq!(
            doc["scopes_supported"],
            serde_json::json!(["openid", "profile", "email", "offline_access"])
        );
        assert_eq!(
            doc["device_authorization_endpoint"],
            "http://localhost:8080/oauth/device_authorization"
        );
    }

    #[tokio::test]
    async fn test_jwks_served() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/.well-known/jwks.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let jwks: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(jwks["keys"][0]["kty"], "RSA");
        assert_eq!(jwks["keys"][0]["alg"], "RS256");
    }

    #[tokio::test]
    async fn test_token_endpoint_rejects_unknown_client() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/oauth/token")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "grant_type=authorization_code&code=x&redirect_uri=https://a/cb&code_verifier=y&client_id=nope",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"], "invalid_client");
    }

    #[tokio::test]
    async fn test_tenant_switch_requires_session() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tenant/switch")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"org_id":"org-acme"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
