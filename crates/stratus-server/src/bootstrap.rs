//! Startup wiring: stores, signing key, services, and seed data.

use std::sync::Arc;

use anyhow::Context;
use time::OffsetDateTime;
use tracing::{info, warn};

use stratus_auth::http::authorize::AuthorizeState;
use stratus_auth::http::device::DeviceState;
use stratus_auth::http::discovery::DiscoveryState;
use stratus_auth::http::jwks::JwksState;
use stratus_auth::http::tenant::TenantState;
use stratus_auth::http::token::TokenState;
use stratus_auth::oauth::authorize::AuthorizationService;
use stratus_auth::oauth::device::DeviceFlowService;
use stratus_auth::storage::{
    AuthorizationCodeStorage, ClientStorage, DeviceAuthorizationStorage, MembershipStorage,
    RefreshTokenStorage, RevokedTokenStorage, TenantContextStorage,
};
use stratus_auth::tenant::context::TenantResolver;
use stratus_auth::tenant::guard::MembershipGuard;
use stratus_auth::token::jwt::{JwtService, SigningKeyPair};
use stratus_auth::token::service::TokenService;
use stratus_auth::types::refresh_token::hash_token;
use stratus_auth::types::{Client, Membership};

use stratus_store_memory::{
    MemoryAuthorizationCodeStore, MemoryClientStore, MemoryDeviceStore, MemoryMembershipStore,
    MemoryRefreshTokenStore, MemoryRevokedTokenStore, MemoryTenantContextStore,
};

use crate::config::ServerConfig;

/// Everything the router needs, fully wired.
#[derive(Clone)]
pub struct AppState {
    /// Authorization endpoint state.
    pub authorize: AuthorizeState,
    /// Token endpoint state.
    pub token: TokenState,
    /// Device endpoints state.
    pub device: DeviceState,
    /// Tenant switch endpoint state.
    pub tenant: TenantState,
    /// Discovery endpoint state.
    pub discovery: DiscoveryState,
    /// JWKS endpoint state.
    pub jwks: JwksState,
}

/// Builds the application state from configuration.
///
/// # Errors
///
/// Fails when the signing key cannot be loaded or generated, or when a
/// seed client is invalid.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let signing_key = load_signing_key(config)?;
    let jwt = Arc::new(JwtService::new(signing_key, config.auth.issuer.clone()));

    let clients = Arc::new(MemoryClientStore::new());
    let codes = Arc::new(MemoryAuthorizationCodeStore::new());
    let devices = Arc::new(MemoryDeviceStore::new());
    let memberships = Arc::new(MemoryMembershipStore::new());
    let refresh_tokens = Arc::new(MemoryRefreshTokenStore::new());
    let revoked = Arc::new(MemoryRevokedTokenStore::new());
    let contexts = Arc::new(MemoryTenantContextStore::new());

    seed_clients(config, clients.as_ref()).await?;
    seed_memberships(config, memberships.as_ref()).await;

    let resolver = Arc::new(TenantResolver::new(
        Arc::clone(&contexts) as Arc<dyn TenantContextStorage>,
        Arc::clone(&memberships) as Arc<dyn MembershipStorage>,
        config.auth.tenant.clone(),
    ));
    let guard = Arc::new(MembershipGuard::new(
        Arc::clone(&memberships) as Arc<dyn MembershipStorage>
    ));

    let authorization = Arc::new(AuthorizationService::new(
        Arc::clone(&clients) as Arc<dyn ClientStorage>,
        Arc::clone(&codes) as Arc<dyn AuthorizationCodeStorage>,
        Arc::clone(&resolver),
        config.auth.clone(),
    ));
    let tokens = Arc::new(TokenService::new(
        Arc::clone(&jwt),
        Arc::clone(&clients) as Arc<dyn ClientStorage>,
        Arc::clone(&codes) as Arc<dyn AuthorizationCodeStorage>,
        Arc::clone(&devices) as Arc<dyn DeviceAuthorizationStorage>,
        Arc::clone(&refresh_tokens) as Arc<dyn RefreshTokenStorage>,
        Arc::clone(&revoked) as Arc<dyn RevokedTokenStorage>,
        Arc::clone(&resolver),
        config.auth.clone(),
    ));
    let device_flow = Arc::new(DeviceFlowService::new(
        Arc::clone(&clients) as Arc<dyn ClientStorage>,
        Arc::clone(&devices) as Arc<dyn DeviceAuthorizationStorage>,
        Arc::clone(&resolver),
        config.auth.clone(),
    ));

    Ok(AppState {
        authorize: AuthorizeState::new(Arc::clone(&authorization), Arc::clone(&jwt)),
        token: TokenState::new(Arc::clone(&tokens)),
        device: DeviceState::new(Arc::clone(&device_flow), Arc::clone(&jwt)),
        tenant: TenantState::new(
            Arc::clone(&contexts) as Arc<dyn TenantContextStorage>,
            Arc::clone(&guard),
            Arc::clone(&jwt),
            config.auth.tenant.clone(),
        ),
        discovery: DiscoveryState::new(config.auth.clone()),
        jwks: JwksState::new(jwt),
    })
}

fn load_signing_key(config: &ServerConfig) -> anyhow::Result<SigningKeyPair> {
    let signing = &config.signing_key;

    if let (Some(private_path), Some(public_path)) =
        (&signing.private_key_path, &signing.public_key_path)
    {
        let private_pem = std::fs::read_to_string(private_path)
            .with_context(|| format!("reading private key '{private_path}'"))?;
        let public_pem = std::fs::read_to_string(public_path)
            .with_context(|| format!("reading public key '{public_path}'"))?;
        let kid = signing
            .kid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let key = SigningKeyPair::from_pem(kid, &private_pem, &public_pem)
            .context("loading signing key")?;
        info!(kid = %key.kid, "signing key loaded");
        return Ok(key);
    }

    warn!("no signing key configured, generating an ephemeral RSA key");
    let key = SigningKeyPair::generate_rsa().context("generating signing key")?;
    info!(kid = %key.kid, "ephemeral signing key generated");
    Ok(key)
}

async fn seed_clients(config: &ServerConfig, store: &MemoryClientStore) -> anyhow::Result<()> {
    for seed in &config.clients {
        let client = Client {
            client_id: seed.client_id.clone(),
            client_secret_hash: seed.client_secret.as_deref().map(hash_token),
            name: seed.name.clone(),
            grant_types: seed.grant_types.clone(),
            redirect_uris: seed.redirect_uris.clone(),
            scopes: seed.scopes.clone(),
            token_auth_method: seed.token_auth_method,
            confidential: seed.confidential,
            active: true,
            access_token_lifetime: seed.access_token_lifetime,
            refresh_token_lifetime: seed.refresh_token_lifetime,
            pkce_required: None,
        };
        client
            .validate()
            .with_context(|| format!("seed client '{}'", seed.client_id))?;

        info!(client_id = %client.client_id, name = %client.name, "client registered");
        store.register(client).await?;
    }
    Ok(())
}

async fn seed_memberships(config: &ServerConfig, store: &MemoryMembershipStore) {
    for seed in &config.memberships {
        store
            .add(Membership {
                user_id: seed.user_id.clone(),
                org_id: seed.org_id.clone(),
                org_name: seed.org_name.clone(),
                role: seed.role,
                created_at: OffsetDateTime::now_utc(),
            })
            .await;
    }
    if !config.memberships.is_empty() {
        info!(count = config.memberships.len(), "memberships seeded");
    }
}
