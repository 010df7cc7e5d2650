//! Token endpoint service.
//!
//! Authenticates the client, dispatches on the grant, and issues signed
//! tokens. All three grants funnel through one issuance path so claims are
//! built identically regardless of how the authorization happened.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::code::generate_code;
use crate::oauth::device::DeviceStatus;
use crate::oauth::pkce::{PkceChallenge, PkceVerifier};
use crate::oauth::token::{Grant, TokenRequest, TokenResponse};
use crate::storage::{
    AuthorizationCodeStorage, ClientStorage, ConsumeOutcome, DeviceAuthorizationStorage,
    RefreshTokenStorage, RevokedTokenStorage,
};
use crate::tenant::{ResolvedTenant, TenantResolver};
use crate::token::jwt::{AccessTokenClaims, IdTokenClaims, JwtError, JwtService};
use crate::types::refresh_token::hash_token;
use crate::types::{Client, GrantType, RefreshToken};

/// Material for the optional ID token alongside an access token.
struct IdTokenContext {
    nonce: Option<String>,
    auth_time: OffsetDateTime,
}

/// The complete token set produced by one issuance.
struct IssuedTokens {
    response: TokenResponse,
    jti: String,
    refresh_hash: Option<String>,
}

/// Service behind the token endpoint.
pub struct TokenService {
    jwt: Arc<JwtService>,
    clients: Arc<dyn ClientStorage>,
    codes: Arc<dyn AuthorizationCodeStorage>,
    devices: Arc<dyn DeviceAuthorizationStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    revoked: Arc<dyn RevokedTokenStorage>,
    tenants: Arc<TenantResolver>,
    config: AuthConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jwt: Arc<JwtService>,
        clients: Arc<dyn ClientStorage>,
        codes: Arc<dyn AuthorizationCodeStorage>,
        devices: Arc<dyn DeviceAuthorizationStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        revoked: Arc<dyn RevokedTokenStorage>,
        tenants: Arc<TenantResolver>,
        config: AuthConfig,
    ) -> Self {
        Self {
            jwt,
            clients,
            codes,
            devices,
            refresh_tokens,
            revoked,
            tenants,
            config,
        }
    }

    /// Processes a token request.
    ///
    /// # Errors
    ///
    /// Returns the OAuth-mapped `AuthError` for every failure mode; the
    /// HTTP layer turns it into an RFC 6749 / RFC 8628 error body.
    pub async fn exchange(&self, request: &TokenRequest) -> Result<TokenResponse, AuthError> {
        let grant = Grant::from_request(request)?;
        let client = self.authenticate_client(request).await?;

        if !client.is_grant_type_allowed(grant.grant_type()) {
            return Err(AuthError::unauthorized_client(format!(
                "Client is not allowed the {} grant",
                grant.grant_type()
            )));
        }

        match grant {
            Grant::AuthorizationCode {
                code,
                redirect_uri,
                code_verifier,
            } => {
                self.exchange_code(&client, &code, &redirect_uri, code_verifier.as_deref())
                    .await
            }
            Grant::RefreshToken { refresh_token } => {
                self.exchange_refresh(&client, &refresh_token).await
            }
            Grant::DeviceCode { device_code } => {
                self.exchange_device(&client, &device_code).await
            }
        }
    }

    /// Validates an access token presented to a protected endpoint.
    ///
    /// Checks signature, issuer, expiry, and the revocation denylist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` for any invalid or revoked token.
    pub async fn validate_access(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let data = self
            .jwt
            .decode::<AccessTokenClaims>(token)
            .map_err(|e| AuthError::unauthorized(e.to_string()))?;

        if self.revoked.is_revoked(&data.claims.jti).await? {
            return Err(AuthError::unauthorized("Token has been revoked"));
        }

        Ok(data.claims)
    }

    // -------------------------------------------------------------------------
    // Client authentication
    // -------------------------------------------------------------------------

    async fn authenticate_client(&self, request: &TokenRequest) -> Result<Client, AuthError> {
        let client_id = request
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::invalid_client("Missing client_id"))?;

        let client = self
            .clients
            .find_by_id(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is disabled"));
        }

        if client.confidential {
            let secret = request
                .client_secret
                .as_deref()
                .ok_or_else(|| AuthError::invalid_client("Missing client_secret"))?;
            let expected = client
                .client_secret_hash
                .as_deref()
                .ok_or_else(|| AuthError::invalid_client("Client has no secret registered"))?;
            if hash_token(secret) != expected {
                return Err(AuthError::invalid_client("Invalid client_secret"));
            }
        }

        Ok(client)
    }

    // -------------------------------------------------------------------------
    // authorization_code
    // -------------------------------------------------------------------------

    async fn exchange_code(
        &self,
        client: &Client,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenResponse, AuthError> {
        let record = match self.codes.consume(code).await? {
            ConsumeOutcome::Consumed(record) => record,
            ConsumeOutcome::Replayed(record) => {
                // The code leaked or the client retried; either way the
                // first exchange's tokens can no longer be trusted.
                warn!(
                    client_id = %client.client_id,
                    user_id = %record.user_id,
                    "authorization code replay detected, revoking issued tokens"
                );
                if let Some(jti) = &record.issued_jti {
                    let retain_until =
                        OffsetDateTime::now_utc() + self.config.oauth.access_token_lifetime;
                    self.revoked.revoke(jti, retain_until).await?;
                }
                if let Some(hash) = &record.issued_refresh_hash {
                    self.refresh_tokens.revoke(hash).await?;
                }
                return Err(AuthError::invalid_grant(
                    "Authorization code has already been used",
                ));
            }
            ConsumeOutcome::Expired => {
                return Err(AuthError::invalid_grant("Authorization code expired"));
            }
            ConsumeOutcome::NotFound => {
                return Err(AuthError::invalid_grant("Invalid authorization code"));
            }
        };

        if record.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Authorization code was issued to another client",
            ));
        }

        if record.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant("redirect_uri mismatch"));
        }

        // A code minted with a challenge can only be exchanged with the
        // matching verifier. Codes without one come from confidential
        // clients registered as PKCE-exempt.
        if let Some(challenge_str) = &record.code_challenge {
            let verifier = code_verifier.ok_or_else(|| {
                AuthError::invalid_request("Missing parameter: code_verifier")
            })?;
            let verifier = PkceVerifier::new(verifier.to_string())
                .map_err(|e| AuthError::invalid_request(e.to_string()))?;
            let challenge = PkceChallenge::new(challenge_str.clone())
                .map_err(|e| AuthError::invalid_request(e.to_string()))?;
            challenge
                .verify(&verifier)
                .map_err(|_| AuthError::PkceVerificationFailed)?;
        }

        // The tenant pinned at authorization time acts as the session
        // organization; a fresher context entry still takes priority.
        let resolved = self
            .tenants
            .resolve(&record.user_id, Some(&record.tenant_id))
            .await?;

        let issued = self
            .issue(
                client,
                &record.user_id,
                &record.scope,
                &resolved,
                Some(IdTokenContext {
                    nonce: record.nonce.clone(),
                    auth_time: record.auth_time,
                }),
            )
            .await?;

        self.codes
            .attach_issuance(code, &issued.jti, issued.refresh_hash.as_deref())
            .await?;

        info!(
            client_id = %client.client_id,
            user_id = %record.user_id,
            tenant_id = %resolved.tenant_id,
            "tokens issued for authorization code"
        );
        Ok(issued.response)
    }

    // -------------------------------------------------------------------------
    // refresh_token
    // -------------------------------------------------------------------------

    async fn exchange_refresh(
        &self,
        client: &Client,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        let hash = hash_token(refresh_token);
        let record = self
            .refresh_tokens
            .find_by_hash(&hash)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        if record.is_expired() {
            self.refresh_tokens.revoke(&hash).await?;
            return Err(AuthError::invalid_grant("Refresh token expired"));
        }

        if record.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Refresh token was issued to another client",
            ));
        }

        // Re-resolve the tenant: a context entry set since issuance wins,
        // and a revoked membership falls back instead of failing.
        let resolved = self
            .tenants
            .resolve(&record.user_id, Some(&record.tenant_id))
            .await?;

        if self.config.oauth.refresh_token_rotation {
            self.refresh_tokens.revoke(&hash).await?;
        }

        let issued = self
            .issue(client, &record.user_id, &record.scope, &resolved, None)
            .await?;

        info!(
            client_id = %client.client_id,
            user_id = %record.user_id,
            tenant_id = %resolved.tenant_id,
            "tokens refreshed"
        );
        Ok(issued.response)
    }

    // -------------------------------------------------------------------------
    // device_code
    // -------------------------------------------------------------------------

    async fn exchange_device(
        &self,
        client: &Client,
        device_code: &str,
    ) -> Result<TokenResponse, AuthError> {
        let penalty = self.config.device.slow_down_penalty.as_secs();
        let poll = self
            .devices
            .poll(device_code, penalty)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid device code"))?;

        if poll.record.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Device code was issued to another client",
            ));
        }

        // Pacing is enforced before anything else so a misbehaving client
        // is slowed down even when a decision is already waiting.
        if poll.too_fast {
            return Err(AuthError::SlowDown {
                interval_secs: poll.record.interval_secs,
            });
        }

        if poll.record.is_expired() {
            self.devices.delete(device_code).await?;
            return Err(AuthError::ExpiredToken);
        }

        match poll.record.status {
            DeviceStatus::Pending => Err(AuthError::AuthorizationPending),
            DeviceStatus::Denied => {
                self.devices.delete(device_code).await?;
                Err(AuthError::access_denied("The user denied the request"))
            }
            DeviceStatus::Approved => {
                let user_id = poll.record.decided_by.clone().ok_or_else(|| {
                    AuthError::internal("Approved device request has no approver")
                })?;

                let resolved = self
                    .tenants
                    .resolve(&user_id, poll.record.approved_org.as_deref())
                    .await?;

                let issued = self
                    .issue(
                        client,
                        &user_id,
                        &poll.record.scope,
                        &resolved,
                        Some(IdTokenContext {
                            nonce: None,
                            auth_time: OffsetDateTime::now_utc(),
                        }),
                    )
                    .await?;

                // Terminal exchange: later polls see an unknown code
                self.devices.delete(device_code).await?;

                info!(
                    client_id = %client.client_id,
                    user_id = %user_id,
                    tenant_id = %resolved.tenant_id,
                    "tokens issued for device authorization"
                );
                Ok(issued.response)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Shared issuance
    // -------------------------------------------------------------------------

    async fn issue(
        &self,
        client: &Client,
        user_id: &str,
        scope: &str,
        resolved: &ResolvedTenant,
        id_context: Option<IdTokenContext>,
    ) -> Result<IssuedTokens, AuthError> {
        let now = OffsetDateTime::now_utc();
        let access_lifetime = client
            .access_token_lifetime
            .unwrap_or_else(|| self.config.oauth.access_token_lifetime.as_secs() as i64);
        let jti = uuid::Uuid::new_v4().to_string();

        let access_claims = AccessTokenClaims {
            iss: self.jwt.issuer().to_string(),
            sub: user_id.to_string(),
            aud: self.config.audience.clone(),
            exp: now.unix_timestamp() + access_lifetime,
            iat: now.unix_timestamp(),
            jti: jti.clone(),
            scope: scope.to_string(),
            client_id: client.client_id.clone(),
            tenant_id: resolved.tenant_id.clone(),
            organization_ids: resolved.organization_ids.clone(),
            role: resolved.role,
        };
        let access_token = self.jwt.encode(&access_claims).map_err(map_jwt_error)?;

        let mut response = TokenResponse::new(
            access_token,
            u64::try_from(access_lifetime).unwrap_or(0),
            scope.to_string(),
        );

        // ID token only when requested via the openid scope
        if let Some(ctx) = id_context
            && scope.split_whitespace().any(|s| s == "openid")
        {
            let id_lifetime = self.config.oauth.id_token_lifetime.as_secs() as i64;
            let id_claims = IdTokenClaims {
                iss: self.jwt.issuer().to_string(),
                sub: user_id.to_string(),
                aud: client.client_id.clone(),
                exp: now.unix_timestamp() + id_lifetime,
                iat: now.unix_timestamp(),
                auth_time: ctx.auth_time.unix_timestamp(),
                tenant_id: resolved.tenant_id.clone(),
                organization_ids: resolved.organization_ids.clone(),
                organization_names: resolved.organization_names.clone(),
                nonce: ctx.nonce,
            };
            let id_token = self.jwt.encode(&id_claims).map_err(map_jwt_error)?;
            response = response.with_id_token(id_token);
        }

        let mut refresh_hash = None;
        if client.is_grant_type_allowed(GrantType::RefreshToken) {
            let refresh_lifetime = client
                .refresh_token_lifetime
                .unwrap_or_else(|| self.config.oauth.refresh_token_lifetime.as_secs() as i64);
            let plain = generate_code();
            let hash = hash_token(&plain);
            self.refresh_tokens
                .store(RefreshToken {
                    token_hash: hash.clone(),
                    client_id: client.client_id.clone(),
                    user_id: user_id.to_string(),
                    tenant_id: resolved.tenant_id.clone(),
                    scope: scope.to_string(),
                    expires_at: now + time::Duration::seconds(refresh_lifetime),
                    created_at: now,
                })
                .await?;
            refresh_hash = Some(hash);
            response = response.with_refresh_token(plain);
        }

        Ok(IssuedTokens {
            response,
            jti,
            refresh_hash,
        })
    }
}

fn map_jwt_error(err: JwtError) -> AuthError {
    AuthError::internal(format!("Token signing failed: {err}"))
}
