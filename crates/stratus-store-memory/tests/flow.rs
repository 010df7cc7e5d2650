//! End-to-end flows through the authorization services backed by the
//! in-memory stores.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use time::OffsetDateTime;

use stratus_auth::config::AuthConfig;
use stratus_auth::error::AuthError;
use stratus_auth::oauth::authorize::{AuthorizationRequest, AuthorizationService, AuthorizeContext};
use stratus_auth::oauth::device::{DeviceAuthorization, DeviceFlowService, DeviceStatus, DeviceVerdict};
use stratus_auth::oauth::pkce::{PkceChallenge, PkceVerifier};
use stratus_auth::oauth::token::{TokenRequest, TokenResponse};
use stratus_auth::storage::{
    AuthorizationCodeStorage, ClientStorage, DeviceAuthorizationStorage, MembershipStorage,
    TenantContextStorage,
};
use stratus_auth::tenant::context::{TenantContextEntry, TenantResolver};
use stratus_auth::tenant::guard::MembershipGuard;
use stratus_auth::token::jwt::{AccessTokenClaims, IdTokenClaims, JwtService, SigningKeyPair};
use stratus_auth::token::service::TokenService;
use stratus_auth::types::refresh_token::hash_token;
use stratus_auth::types::{Client, GrantType, Membership, OrgRole, TokenAuthMethod};

use stratus_store_memory::{
    MemoryAuthorizationCodeStore, MemoryClientStore, MemoryDeviceStore, MemoryMembershipStore,
    MemoryRefreshTokenStore, MemoryRevokedTokenStore, MemoryTenantContextStore,
};

const DEVICE_CODE_URN: &str = "urn:ietf:params:oauth:grant-type:device_code";

struct Env {
    clients: Arc<MemoryClientStore>,
    codes: Arc<MemoryAuthorizationCodeStore>,
    devices: Arc<MemoryDeviceStore>,
    memberships: Arc<MemoryMembershipStore>,
    contexts: Arc<MemoryTenantContextStore>,
    jwt: Arc<JwtService>,
    authz: AuthorizationService,
    tokens: TokenService,
    device_flow: DeviceFlowService,
    guard: MembershipGuard,
}

impl Env {
    async fn new(config: AuthConfig) -> Self {
        let clients = Arc::new(MemoryClientStore::new());
        let codes = Arc::new(MemoryAuthorizationCodeStore::new());
        let devices = Arc::new(MemoryDeviceStore::new());
        let memberships = Arc::new(MemoryMembershipStore::new());
        let refresh_tokens = Arc::new(MemoryRefreshTokenStore::new());
        let revoked = Arc::new(MemoryRevokedTokenStore::new());
        let contexts = Arc::new(MemoryTenantContextStore::new());

        let key_pair = SigningKeyPair::generate_rsa().expect("key generation");
        let jwt = Arc::new(JwtService::new(key_pair, config.issuer.clone()));

        let resolver = Arc::new(TenantResolver::new(
            Arc::clone(&contexts) as Arc<dyn TenantContextStorage>,
            Arc::clone(&memberships) as Arc<dyn MembershipStorage>,
            config.tenant.clone(),
        ));

        clients
            .register(Client {
                client_id: "web-app".to_string(),
                client_secret_hash: None,
                name: "Web App".to_string(),
                grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
                redirect_uris: vec!["https://app.example/callback".to_string()],
                scopes: vec![],
                token_auth_method: TokenAuthMethod::None,
                confidential: false,
                active: true,
                access_token_lifetime: None,
                refresh_token_lifetime: None,
                pkce_required: None,
            })
            .await
            .unwrap();

        clients
            .register(Client {
                client_id: "tv-app".to_string(),
                client_secret_hash: None,
                name: "TV App".to_string(),
                grant_types: vec![GrantType::DeviceCode, GrantType::RefreshToken],
                redirect_uris: vec![],
                scopes: vec![],
                token_auth_method: TokenAuthMethod::None,
                confidential: false,
                active: true,
                access_token_lifetime: None,
                refresh_token_lifetime: None,
                pkce_required: None,
            })
            .await
            .unwrap();

        memberships
            .add(Membership {
                user_id: "user-1".to_string(),
                org_id: "org-acme".to_string(),
                org_name: "Acme Corp".to_string(),
                role: OrgRole::Admin,
                created_at: OffsetDateTime::now_utc(),
            })
            .await;
        memberships
            .add(Membership {
                user_id: "user-1".to_string(),
                org_id: "org-beta".to_string(),
                org_name: "Beta LLC".to_string(),
                role: OrgRole::Member,
                created_at: OffsetDateTime::now_utc(),
            })
            .await;

        let authz = AuthorizationService::new(
            Arc::clone(&clients) as Arc<dyn ClientStorage>,
            Arc::clone(&codes) as Arc<dyn AuthorizationCodeStorage>,
            Arc::clone(&resolver),
            config.clone(),
        );

        let tokens = TokenService::new(
            Arc::clone(&jwt),
            Arc::clone(&clients) as Arc<dyn ClientStorage>,
            Arc::clone(&codes) as Arc<dyn AuthorizationCodeStorage>,
            Arc::clone(&devices) as Arc<dyn DeviceAuthorizationStorage>,
            Arc::clone(&refresh_tokens) as _,
            Arc::clone(&revoked) as _,
            Arc::clone(&resolver),
            config.clone(),
        );

        let device_flow = DeviceFlowService::new(
            Arc::clone(&clients) as Arc<dyn ClientStorage>,
            Arc::clone(&devices) as Arc<dyn DeviceAuthorizationStorage>,
            Arc::clone(&resolver),
            config.clone(),
        );

        let guard = MembershipGuard::new(Arc::clone(&memberships) as Arc<dyn MembershipStorage>);

        Self {
            clients,
            codes,
            devices,
            memberships,
            contexts,
            jwt,
            authz,
            tokens,
            device_flow,
            guard,
        }
    }

    /// Runs the front channel of the code flow and returns the code.
    async fn obtain_code(
        &self,
        user_id: &str,
        active_org: Option<&str>,
        verifier: &PkceVerifier,
        scope: &str,
    ) -> String {
        let challenge = PkceChallenge::from_verifier(verifier);
        let request = AuthorizationRequest {
            response_type: "code".to_string(),
            client_id: "web-app".to_string(),
            redirect_uri: "https://app.example/callback".to_string(),
            scope: Some(scope.to_string()),
            state: Some("xyz".to_string()),
            code_challenge: Some(challenge.as_str().to_string()),
            code_challenge_method: Some("S256".to_string()),
            nonce: Some("n-0S6_WzA2Mj".to_string()),
        };
        let context = AuthorizeContext {
            user_id: user_id.to_string(),
            active_org: active_org.map(ToString::to_string),
            auth_time: OffsetDateTime::now_utc(),
        };

        let redirect = self.authz.authorize(&request, &context).await.unwrap();
        assert!(redirect.as_str().starts_with("https://app.example/callback"));

        let code = redirect
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .expect("redirect carries a code");
        let state = redirect
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());
        assert_eq!(state.as_deref(), Some("xyz"));
        code
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &PkceVerifier,
    ) -> Result<TokenResponse, AuthError> {
        self.tokens
            .exchange(&TokenRequest {
                grant_type: "authorization_code".to_string(),
                code: Some(code.to_string()),
                redirect_uri: Some("https://app.example/callback".to_string()),
                code_verifier: Some(verifier.as_str().to_string()),
                client_id: Some("web-app".to_string()),
                client_secret: None,
                refresh_token: None,
                device_code: None,
                scope: None,
            })
            .await
    }

    async fn exchange_refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.tokens
            .exchange(&TokenRequest {
                grant_type: "refresh_token".to_string(),
                code: None,
                redirect_uri: None,
                code_verifier: None,
                client_id: Some("web-app".to_string()),
                client_secret: None,
                refresh_token: Some(refresh_token.to_string()),
                device_code: None,
                scope: None,
            })
            .await
    }

    async fn poll_device(&self, device_code: &str) -> Result<TokenResponse, AuthError> {
        self.tokens
            .exchange(&TokenRequest {
                grant_type: DEVICE_CODE_URN.to_string(),
                code: None,
                redirect_uri: None,
                code_verifier: None,
                client_id: Some("tv-app".to_string()),
                client_secret: None,
                refresh_token: None,
                device_code: Some(device_code.to_string()),
                scope: None,
            })
            .await
    }

    fn access_claims(&self, response: &TokenResponse) -> AccessTokenClaims {
        self.jwt
            .decode::<AccessTokenClaims>(&response.access_token)
            .unwrap()
            .claims
    }
}

fn default_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.issuer = "https://id.example.com".to_string();
    config
}

// ---------------------------------------------------------------------------
// Authorization code grant
// ---------------------------------------------------------------------------

#[tokio::test]
async fn authorization_code_flow_issues_tenant_scoped_tokens() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();

    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid profile")
        .await;
    let response = env.exchange_code(&code, &verifier).await.unwrap();

    assert_eq!(response.token_type, "Bearer");
    assert!(response.refresh_token.is_some());

    let claims = env.access_claims(&response);
    assert_eq!(claims.sub, "user-1");
    assert_eq!(claims.client_id, "web-app");
    assert_eq!(claims.tenant_id, "org-acme");
    assert_eq!(claims.role, OrgRole::Admin);
    assert!(claims.organization_ids.contains(&"org-acme".to_string()));
    assert!(claims.organization_ids.contains(&"org-beta".to_string()));

    // openid scope was requested, so an ID token is present
    let id_token = response.id_token.as_deref().expect("ID token issued");
    let id_claims = env.jwt.decode::<IdTokenClaims>(id_token).unwrap().claims;
    assert_eq!(id_claims.aud, "web-app");
    assert_eq!(id_claims.nonce.as_deref(), Some("n-0S6_WzA2Mj"));
    assert_eq!(id_claims.tenant_id, "org-acme");
    assert!(
        id_claims
            .organization_names
            .contains(&"Acme Corp".to_string())
    );
}

#[tokio::test]
async fn wrong_pkce_verifier_is_rejected() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();

    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;

    let wrong = PkceVerifier::generate();
    let err = env.exchange_code(&code, &wrong).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");
}

#[tokio::test]
async fn code_replay_revokes_tokens_from_first_exchange() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();

    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;
    let response = env.exchange_code(&code, &verifier).await.unwrap();

    // The first exchange's access token is currently valid
    env.tokens
        .validate_access(&response.access_token)
        .await
        .unwrap();

    // Replay fails with invalid_grant
    let err = env.exchange_code(&code, &verifier).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");

    // And both tokens from the first exchange are now dead
    let err = env
        .tokens
        .validate_access(&response.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.oauth_error_code(), "unauthorized");

    let refresh = response.refresh_token.unwrap();
    let err = env.exchange_refresh(&refresh).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");
}

// ---------------------------------------------------------------------------
// Tenant context hand-off
// ---------------------------------------------------------------------------

#[tokio::test]
async fn context_entry_takes_priority_over_session_org() {
    let env = Env::new(default_config()).await;

    // The user switches to org-beta in another tab; the code was pinned
    // to org-acme before the switch
    let verifier = PkceVerifier::generate();
    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;

    env.contexts
        .set(TenantContextEntry::new(
            "user-1",
            "org-beta",
            StdDuration::from_secs(300),
        ))
        .await
        .unwrap();

    let response = env.exchange_code(&code, &verifier).await.unwrap();
    let claims = env.access_claims(&response);
    assert_eq!(claims.tenant_id, "org-beta");
    assert_eq!(claims.role, OrgRole::Member);
}

#[tokio::test]
async fn expired_context_entry_falls_back_to_session_org() {
    let env = Env::new(default_config()).await;

    let mut entry = TenantContextEntry::new("user-1", "org-beta", StdDuration::from_secs(300));
    entry.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);
    env.contexts.set(entry).await.unwrap();

    let verifier = PkceVerifier::generate();
    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;
    let response = env.exchange_code(&code, &verifier).await.unwrap();

    assert_eq!(env.access_claims(&response).tenant_id, "org-acme");
}

#[tokio::test]
async fn user_without_memberships_gets_personal_tenant() {
    let env = Env::new(default_config()).await;

    let verifier = PkceVerifier::generate();
    let code = env.obtain_code("user-9", None, &verifier, "openid").await;
    let response = env.exchange_code(&code, &verifier).await.unwrap();

    let claims = env.access_claims(&response);
    assert_eq!(claims.tenant_id, "personal:user-9");
    assert_eq!(claims.role, OrgRole::Owner);
    assert_eq!(claims.organization_ids, vec!["personal:user-9".to_string()]);
}

// ---------------------------------------------------------------------------
// Device authorization grant
// ---------------------------------------------------------------------------

#[tokio::test]
async fn device_flow_end_to_end() {
    let mut config = default_config();
    // Short pacing so the test does not sleep long
    config.device.poll_interval = StdDuration::from_secs(1);
    config.device.slow_down_penalty = StdDuration::from_secs(1);
    let env = Env::new(config).await;

    let begin = env.device_flow.begin("tv-app", Some("openid")).await.unwrap();
    assert_eq!(begin.user_code.len(), 9);
    assert_eq!(
        begin.verification_uri,
        "https://id.example.com/device"
    );
    assert!(begin.verification_uri_complete.contains(&begin.user_code));

    // First poll: pending
    let err = env.poll_device(&begin.device_code).await.unwrap_err();
    assert!(matches!(err, AuthError::AuthorizationPending));

    // Immediate re-poll: slow_down, interval raised
    let err = env.poll_device(&begin.device_code).await.unwrap_err();
    match err {
        AuthError::SlowDown { interval_secs } => assert_eq!(interval_secs, 2),
        other => panic!("expected slow_down, got {other}"),
    }

    // The user approves from a browser where org-acme is active
    env.device_flow
        .verify(
            // Formatting from the device display is normalized
            &begin.user_code.to_lowercase(),
            DeviceVerdict::Approve,
            "user-1",
            Some("org-acme"),
        )
        .await
        .unwrap();

    // Wait out the raised interval, then the poll returns tokens
    tokio::time::sleep(StdDuration::from_millis(2200)).await;
    let response = env.poll_device(&begin.device_code).await.unwrap();

    let claims = env.access_claims(&response);
    assert_eq!(claims.sub, "user-1");
    assert_eq!(claims.client_id, "tv-app");
    assert_eq!(claims.tenant_id, "org-acme");

    // The exchange is terminal; a second poll sees an unknown code
    let err = env.poll_device(&begin.device_code).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");
}

#[tokio::test]
async fn denied_device_request_reports_access_denied() {
    let env = Env::new(default_config()).await;

    let begin = env.device_flow.begin("tv-app", None).await.unwrap();
    env.device_flow
        .verify(&begin.user_code, DeviceVerdict::Deny, "user-1", None)
        .await
        .unwrap();

    // A second verdict is rejected, the first stands
    let err = env
        .device_flow
        .verify(&begin.user_code, DeviceVerdict::Approve, "user-1", None)
        .await
        .unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_request");

    let err = env.poll_device(&begin.device_code).await.unwrap_err();
    assert!(matches!(err, AuthError::AccessDenied { .. }));

    // Denial reporting is terminal too
    let err = env.poll_device(&begin.device_code).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");
}

#[tokio::test]
async fn expired_device_code_reports_expired_token() {
    let env = Env::new(default_config()).await;

    let now = OffsetDateTime::now_utc();
    env.devices
        .create(DeviceAuthorization {
            device_code: "stale-device-code".to_string(),
            user_code: "BCDF-GHJK".to_string(),
            client_id: "tv-app".to_string(),
            scope: String::new(),
            status: DeviceStatus::Pending,
            decided_by: None,
            approved_org: None,
            interval_secs: 5,
            last_polled_at: None,
            expires_at: now - time::Duration::seconds(1),
            created_at: now - time::Duration::minutes(11),
        })
        .await
        .unwrap();

    let err = env.poll_device("stale-device-code").await.unwrap_err();
    assert!(matches!(err, AuthError::ExpiredToken));

    // Verifying an expired code is indistinguishable from an unknown one
    let err = env
        .device_flow
        .verify("BCDF-GHJK", DeviceVerdict::Approve, "user-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound));
}

// ---------------------------------------------------------------------------
// Membership guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn guard_forbids_switching_into_foreign_org() {
    let env = Env::new(default_config()).await;

    env.guard.require_member("user-1", "org-acme").await.unwrap();

    let err = env
        .guard
        .require_member("user-2", "org-acme")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden { .. }));
}

#[tokio::test]
async fn cross_tenant_resource_hidden_as_not_found() {
    let env = Env::new(default_config()).await;

    // A resource in the caller's org resolves
    let value = env
        .guard
        .resolve_resource("user-1", Some(("doc-1", "org-acme".to_string())))
        .await
        .unwrap();
    assert_eq!(value, "doc-1");

    // A missing resource and a foreign-tenant resource produce the same
    // error, so their responses cannot be told apart
    let missing = env
        .guard
        .resolve_resource::<&str>("user-2", None)
        .await
        .unwrap_err();
    let foreign = env
        .guard
        .resolve_resource("user-2", Some(("doc-1", "org-acme".to_string())))
        .await
        .unwrap_err();
    assert!(matches!(missing, AuthError::NotFound));
    assert!(matches!(foreign, AuthError::NotFound));
    assert_eq!(missing.to_string(), foreign.to_string());
}

// ---------------------------------------------------------------------------
// Refresh token rotation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_rotation_invalidates_presented_token() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();

    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;
    let first = env.exchange_code(&code, &verifier).await.unwrap();
    let first_refresh = first.refresh_token.unwrap();

    let second = env.exchange_refresh(&first_refresh).await.unwrap();
    let second_refresh = second.refresh_token.clone().unwrap();
    assert_ne!(first_refresh, second_refresh);
    assert_eq!(env.access_claims(&second).tenant_id, "org-acme");

    // The rotated-out token is gone
    let err = env.exchange_refresh(&first_refresh).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");

    // The replacement still works
    env.exchange_refresh(&second_refresh).await.unwrap();
}

#[tokio::test]
async fn refresh_after_membership_revocation_falls_back() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();

    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;
    let first = env.exchange_code(&code, &verifier).await.unwrap();
    assert_eq!(env.access_claims(&first).tenant_id, "org-acme");

    // The user is removed from the org between issuance and refresh
    assert!(env.memberships.remove("user-1", "org-acme").await);

    let refreshed = env
        .exchange_refresh(&first.refresh_token.unwrap())
        .await
        .unwrap();
    let claims = env.access_claims(&refreshed);

    // The refresh succeeds but the tokens no longer name the lost org
    assert_eq!(claims.tenant_id, "personal:user-1");
    assert!(!claims.organization_ids.contains(&"org-acme".to_string()));
}

// ---------------------------------------------------------------------------
// Single-use enforcement under concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_code_exchanges_issue_exactly_one_token_set() {
    let env = Arc::new(Env::new(default_config()).await);
    let verifier = PkceVerifier::generate();

    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let env = Arc::clone(&env);
        let code = code.clone();
        let verifier = PkceVerifier::new(verifier.as_str().to_string()).unwrap();
        handles.push(tokio::spawn(async move {
            env.exchange_code(&code, &verifier).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    // The codes store kept the consumed record for replay detection
    assert_eq!(env.codes.cleanup_expired().await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Authorize endpoint client checks
// ---------------------------------------------------------------------------

fn authorize_context(user_id: &str, active_org: Option<&str>) -> AuthorizeContext {
    AuthorizeContext {
        user_id: user_id.to_string(),
        active_org: active_org.map(ToString::to_string),
        auth_time: OffsetDateTime::now_utc(),
    }
}

#[tokio::test]
async fn unregistered_redirect_uri_is_unauthorized_client() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();
    let challenge = PkceChallenge::from_verifier(&verifier);

    let request = AuthorizationRequest {
        response_type: "code".to_string(),
        client_id: "web-app".to_string(),
        redirect_uri: "https://evil.example/callback".to_string(),
        scope: None,
        state: None,
        code_challenge: Some(challenge.as_str().to_string()),
        code_challenge_method: Some("S256".to_string()),
        nonce: None,
    };

    let err = env
        .authz
        .authorize(&request, &authorize_context("user-1", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UnauthorizedClient { .. }));
    assert_eq!(err.oauth_error_code(), "unauthorized_client");
}

#[tokio::test]
async fn client_without_code_grant_is_unauthorized_client() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();
    let challenge = PkceChallenge::from_verifier(&verifier);

    // tv-app is registered for the device grant only
    let request = AuthorizationRequest {
        response_type: "code".to_string(),
        client_id: "tv-app".to_string(),
        redirect_uri: "https://app.example/callback".to_string(),
        scope: None,
        state: None,
        code_challenge: Some(challenge.as_str().to_string()),
        code_challenge_method: Some("S256".to_string()),
        nonce: None,
    };

    let err = env
        .authz
        .authorize(&request, &authorize_context("user-1", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UnauthorizedClient { .. }));
}

// ---------------------------------------------------------------------------
// PKCE requirements per client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pkce_exempt_confidential_client_completes_code_flow() {
    let env = Env::new(default_config()).await;
    env.clients
        .register(Client {
            client_id: "backend-app".to_string(),
            client_secret_hash: Some(hash_token("s3cret")),
            name: "Backend App".to_string(),
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            redirect_uris: vec!["https://backend.example/cb".to_string()],
            scopes: vec![],
            token_auth_method: TokenAuthMethod::ClientSecretPost,
            confidential: true,
            active: true,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            pkce_required: None,
        })
        .await
        .unwrap();

    let request = AuthorizationRequest {
        response_type: "code".to_string(),
        client_id: "backend-app".to_string(),
        redirect_uri: "https://backend.example/cb".to_string(),
        scope: Some("openid".to_string()),
        state: None,
        code_challenge: None,
        code_challenge_method: None,
        nonce: None,
    };

    let redirect = env
        .authz
        .authorize(&request, &authorize_context("user-1", Some("org-acme")))
        .await
        .unwrap();
    let code = redirect
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .expect("redirect carries a code");

    let response = env
        .tokens
        .exchange(&TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code),
            redirect_uri: Some("https://backend.example/cb".to_string()),
            code_verifier: None,
            client_id: Some("backend-app".to_string()),
            client_secret: Some("s3cret".to_string()),
            refresh_token: None,
            device_code: None,
            scope: None,
        })
        .await
        .unwrap();

    let claims = env.access_claims(&response);
    assert_eq!(claims.client_id, "backend-app");
    assert_eq!(claims.tenant_id, "org-acme");
}

#[tokio::test]
async fn public_client_cannot_omit_code_challenge() {
    let env = Env::new(default_config()).await;

    let request = AuthorizationRequest {
        response_type: "code".to_string(),
        client_id: "web-app".to_string(),
        redirect_uri: "https://app.example/callback".to_string(),
        scope: None,
        state: None,
        code_challenge: None,
        code_challenge_method: None,
        nonce: None,
    };

    let err = env
        .authz
        .authorize(&request, &authorize_context("user-1", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));
}

#[tokio::test]
async fn code_issued_with_challenge_requires_verifier() {
    let env = Env::new(default_config()).await;
    let verifier = PkceVerifier::generate();

    let code = env
        .obtain_code("user-1", Some("org-acme"), &verifier, "openid")
        .await;

    let err = env
        .tokens
        .exchange(&TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code),
            redirect_uri: Some("https://app.example/callback".to_string()),
            code_verifier: None,
            client_id: Some("web-app".to_string()),
            client_secret: None,
            refresh_token: None,
            device_code: None,
            scope: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));
}
