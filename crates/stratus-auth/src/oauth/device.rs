//! Device authorization grant records (RFC 8628).
//!
//! A device obtains a `device_code` / `user_code` pair, shows the user code
//! on its display, and polls the token endpoint while the user approves or
//! denies the request in a browser.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User-code alphabet.
///
/// Uppercase consonants only (RFC 8628 Section 6.1): no vowels, so random
/// codes cannot spell words, and no easily confused characters.
const USER_CODE_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";

/// Number of characters per user-code segment (format `XXXX-XXXX`).
const USER_CODE_SEGMENT_LEN: usize = 4;

// =============================================================================
// Device Authorization Status
// =============================================================================

/// Status of a device authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Waiting for the user to approve or deny.
    Pending,
    /// Approved; the next valid poll exchanges it for tokens.
    Approved,
    /// Denied by the user.
    Denied,
}

// =============================================================================
// Device Authorization Record
// =============================================================================

/// A stored device authorization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAuthorization {
    /// High-entropy opaque code the device polls with.
    pub device_code: String,

    /// Short human-typable code (`XXXX-XXXX`) shown on the device.
    pub user_code: String,

    /// Client that initiated the request.
    pub client_id: String,

    /// Requested scope (space-separated).
    pub scope: String,

    /// Current status.
    pub status: DeviceStatus,

    /// User who approved or denied the request, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,

    /// Tenant active for the approver at approval time. Tokens issued by
    /// the exchange carry this tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_org: Option<String>,

    /// Required seconds between polls. Grows when the device polls too fast.
    pub interval_secs: u64,

    /// Last time the device polled, for pacing enforcement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_polled_at: Option<OffsetDateTime>,

    /// When the request expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the request was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl DeviceAuthorization {
    /// Checks if the request has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Checks if the request is still awaiting a user decision.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == DeviceStatus::Pending
    }
}

// =============================================================================
// Code Generation
// =============================================================================

/// Generates a random device code.
///
/// 32 random bytes, base64url encoded (43 characters, 256 bits of entropy).
#[must_use]
pub fn generate_device_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates a random user code in `XXXX-XXXX` format.
///
/// Eight characters from a 20-letter alphabet give about 42 bits of
/// space. Combined with the request lifetime and poll pacing, online
/// guessing is not practical.
#[must_use]
pub fn generate_user_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(USER_CODE_SEGMENT_LEN * 2 + 1);
    for i in 0..(USER_CODE_SEGMENT_LEN * 2) {
        if i == USER_CODE_SEGMENT_LEN {
            code.push('-');
        }
        let idx = rng.gen_range(0..USER_CODE_ALPHABET.len());
        code.push(USER_CODE_ALPHABET[idx] as char);
    }
    code
}

/// Normalizes a user-typed code for lookup.
///
/// Uppercases and strips whitespace and hyphens, then re-inserts the
/// canonical hyphen, so `bcdf-ghjk`, `BCDFGHJK` and `bcdf ghjk` all match
/// the stored `BCDF-GHJK`.
#[must_use]
pub fn normalize_user_code(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if cleaned.len() == USER_CODE_SEGMENT_LEN * 2 {
        format!(
            "{}-{}",
            &cleaned[..USER_CODE_SEGMENT_LEN],
            &cleaned[USER_CODE_SEGMENT_LEN..]
        )
    } else {
        cleaned
    }
}

// =============================================================================
// Device Flow Service
// =============================================================================

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::{ClientStorage, DeviceAuthorizationStorage, DeviceDecision};
use crate::tenant::TenantResolver;
use crate::types::GrantType;

/// Response body for the device authorization endpoint (RFC 8628
/// Section 3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    /// Code the device polls the token endpoint with.
    pub device_code: String,

    /// Code the user types at the verification URI.
    pub user_code: String,

    /// Where the user goes to enter the code.
    pub verification_uri: String,

    /// Verification URI with the user code pre-filled.
    pub verification_uri_complete: String,

    /// Request lifetime in seconds.
    pub expires_in: u64,

    /// Minimum seconds between polls.
    pub interval: u64,
}

/// The decision a user makes on the verification page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceVerdict {
    /// Approve the device under the user's active tenant.
    Approve,
    /// Deny the device.
    Deny,
}

/// Orchestrates the front channel of the device authorization grant:
/// request creation and the user's approve/deny decision. The polling
/// side lives in the token service.
pub struct DeviceFlowService {
    clients: Arc<dyn ClientStorage>,
    devices: Arc<dyn DeviceAuthorizationStorage>,
    tenants: Arc<TenantResolver>,
    config: AuthConfig,
}

impl DeviceFlowService {
    /// Creates a new device flow service.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        devices: Arc<dyn DeviceAuthorizationStorage>,
        tenants: Arc<TenantResolver>,
        config: AuthConfig,
    ) -> Self {
        Self {
            clients,
            devices,
            tenants,
            config,
        }
    }

    /// Starts a device authorization request.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClient` for unknown or inactive clients,
    /// `AuthError::UnauthorizedClient` for clients without the device
    /// grant, and `AuthError::InvalidScope` for scopes the client may not
    /// request.
    pub async fn begin(
        &self,
        client_id: &str,
        scope: Option<&str>,
    ) -> Result<DeviceAuthorizationResponse, AuthError> {
        let client = self
            .clients
            .find_by_id(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is disabled"));
        }

        if !client.is_grant_type_allowed(GrantType::DeviceCode) {
            return Err(AuthError::unauthorized_client(
                "Client is not allowed the device authorization grant",
            ));
        }

        let scope = scope.unwrap_or_default().to_string();
        for s in scope.split_whitespace() {
            if !client.is_scope_allowed(s) {
                return Err(AuthError::invalid_scope(format!(
                    "Scope '{s}' is not allowed for this client"
                )));
            }
        }

        // User codes have 42 bits of space, so collisions among live
        // records are rare but possible. Re-draw instead of clobbering;
        // repeated collisions mean something is wrong with the store.
        let mut user_code = None;
        for _ in 0..4 {
            let candidate = generate_user_code();
            if self.devices.find_by_user_code(&candidate).await?.is_none() {
                user_code = Some(candidate);
                break;
            }
        }
        let Some(user_code) = user_code else {
            return Err(AuthError::internal("Could not allocate a unique user code"));
        };

        let now = OffsetDateTime::now_utc();
        let record = DeviceAuthorization {
            device_code: generate_device_code(),
            user_code,
            client_id: client.client_id.clone(),
            scope,
            status: DeviceStatus::Pending,
            decided_by: None,
            approved_org: None,
            interval_secs: self.config.device.poll_interval.as_secs(),
            last_polled_at: None,
            expires_at: now + self.config.device.code_lifetime,
            created_at: now,
        };

        let verification_uri = format!(
            "{}{}",
            self.config.issuer.trim_end_matches('/'),
            self.config.device.verification_path
        );
        let response = DeviceAuthorizationResponse {
            device_code: record.device_code.clone(),
            user_code: record.user_code.clone(),
            verification_uri: verification_uri.clone(),
            verification_uri_complete: format!(
                "{verification_uri}?user_code={}",
                record.user_code
            ),
            expires_in: self.config.device.code_lifetime.as_secs(),
            interval: record.interval_secs,
        };

        info!(
            client_id = %client.client_id,
            user_code = %record.user_code,
            "device authorization request created"
        );
        self.devices.create(record).await?;

        Ok(response)
    }

    /// Applies a user's verdict to a pending request.
    ///
    /// An approval is recorded together with the approver and the tenant
    /// resolved for them at this moment, which the token exchange will
    /// scope the issued tokens to. The first decision wins; later verdicts
    /// fail.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` for unknown or expired user codes and
    /// `AuthError::InvalidRequest` when the request was already decided.
    pub async fn verify(
        &self,
        user_code: &str,
        verdict: DeviceVerdict,
        user_id: &str,
        active_org: Option<&str>,
    ) -> Result<(), AuthError> {
        let normalized = normalize_user_code(user_code);

        let record = self
            .devices
            .find_by_user_code(&normalized)
            .await?
            .ok_or(AuthError::NotFound)?;
        if record.is_expired() {
            return Err(AuthError::NotFound);
        }

        let decision = match verdict {
            DeviceVerdict::Approve => {
                let resolved = self.tenants.resolve(user_id, active_org).await?;
                self.devices
                    .approve(&normalized, user_id, &resolved.tenant_id)
                    .await?
            }
            DeviceVerdict::Deny => self.devices.deny(&normalized, user_id).await?,
        };

        match decision {
            DeviceDecision::Applied => {
                info!(user_code = %normalized, user_id = %user_id, ?verdict, "device request decided");
                Ok(())
            }
            DeviceDecision::AlreadyDecided(status) => {
                warn!(user_code = %normalized, ?status, "verdict for an already decided device request");
                Err(AuthError::invalid_request(
                    "This request has already been decided",
                ))
            }
            DeviceDecision::NotFound => Err(AuthError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_device_code_entropy() {
        let a = generate_device_code();
        let b = generate_device_code();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_user_code_format() {
        let code = generate_user_code();
        assert_eq!(code.len(), 9);
        assert_eq!(code.as_bytes()[4], b'-');
        for (i, c) in code.chars().enumerate() {
            if i == 4 {
                continue;
            }
            assert!(
                USER_CODE_ALPHABET.contains(&(c as u8)),
                "unexpected character {c} in user code"
            );
        }
    }

    #[test]
    fn test_normalize_user_code() {
        assert_eq!(normalize_user_code("bcdf-ghjk"), "BCDF-GHJK");
        assert_eq!(normalize_user_code("BCDFGHJK"), "BCDF-GHJK");
        assert_eq!(normalize_user_code(" bcdf ghjk "), "BCDF-GHJK");
        assert_eq!(normalize_user_code("BCDF-GHJK"), "BCDF-GHJK");
        // Wrong length passes through cleaned but unhyphenated
        assert_eq!(normalize_user_code("bcd"), "BCD");
    }

    #[test]
    fn test_status_predicates() {
        let now = OffsetDateTime::now_utc();
        let mut record = DeviceAuthorization {
            device_code: generate_device_code(),
            user_code: generate_user_code(),
            client_id: "tv-app".to_string(),
            scope: "openid".to_string(),
            status: DeviceStatus::Pending,
            decided_by: None,
            approved_org: None,
            interval_secs: 5,
            last_polled_at: None,
            expires_at: now + Duration::minutes(10),
            created_at: now,
        };
        assert!(record.is_pending());
        assert!(!record.is_expired());

        record.status = DeviceStatus::Approved;
        assert!(!record.is_pending());

        record.expires_at = now - Duration::seconds(1);
        assert!(record.is_expired());
    }

    use async_trait::async_trait;

    use crate::config::TenantConfig;
    use crate::storage::{DevicePoll, MembershipStorage, TenantContextStorage};
    use crate::tenant::context::TenantContextEntry;
    use crate::types::{Client, Membership, TokenAuthMethod};

    struct SingleClientStore(Client);

    #[async_trait]
    impl ClientStorage for SingleClientStore {
        async fn register(&self, _client: Client) -> Result<(), AuthError> {
            Ok(())
        }
        async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>, AuthError> {
            Ok((client_id == self.0.client_id).then(|| self.0.clone()))
        }
    }

    /// Reports every user code as already taken.
    struct SaturatedDeviceStore;

    #[async_trait]
    impl DeviceAuthorizationStorage for SaturatedDeviceStore {
        async fn create(&self, _record: DeviceAuthorization) -> Result<(), AuthError> {
            Ok(())
        }
        async fn find_by_user_code(
            &self,
            user_code: &str,
        ) -> Result<Option<DeviceAuthorization>, AuthError> {
            let now = OffsetDateTime::now_utc();
            Ok(Some(DeviceAuthorization {
                device_code: generate_device_code(),
                user_code: user_code.to_string(),
                client_id: "tv-app".to_string(),
                scope: String::new(),
                status: DeviceStatus::Pending,
                decided_by: None,
                approved_org: None,
                interval_secs: 5,
                last_polled_at: None,
                expires_at: now + Duration::minutes(10),
                created_at: now,
            }))
        }
        async fn approve(
            &self,
            _user_code: &str,
            _user_id: &str,
            _approved_org: &str,
        ) -> Result<DeviceDecision, AuthError> {
            Ok(DeviceDecision::NotFound)
        }
        async fn deny(&self, _user_code: &str, _user_id: &str) -> Result<DeviceDecision, AuthError> {
            Ok(DeviceDecision::NotFound)
        }
        async fn poll(
            &self,
            _device_code: &str,
            _slow_down_penalty_secs: u64,
        ) -> Result<Option<DevicePoll>, AuthError> {
            Ok(None)
        }
        async fn delete(&self, _device_code: &str) -> Result<(), AuthError> {
            Ok(())
        }
        async fn cleanup_expired(&self) -> Result<u64, AuthError> {
            Ok(0)
        }
    }

    struct NoContext;

    #[async_trait]
    impl TenantContextStorage for NoContext {
        async fn set(&self, _entry: TenantContextEntry) -> Result<(), AuthError> {
            Ok(())
        }
        async fn get(&self, _user_id: &str) -> Result<Option<TenantContextEntry>, AuthError> {
            Ok(None)
        }
        async fn remove(&self, _user_id: &str) -> Result<(), AuthError> {
            Ok(())
        }
        async fn cleanup_expired(&self) -> Result<u64, AuthError> {
            Ok(0)
        }
    }

    struct NoMemberships;

    #[async_trait]
    impl MembershipStorage for NoMemberships {
        async fn find_membership(
            &self,
            _user_id: &str,
            _org_id: &str,
        ) -> Result<Option<Membership>, AuthError> {
            Ok(None)
        }
        async fn memberships_for_user(&self, _user_id: &str) -> Result<Vec<Membership>, AuthError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_begin_fails_when_user_codes_keep_colliding() {
        let client = Client {
            client_id: "tv-app".to_string(),
            client_secret_hash: None,
            name: "TV App".to_string(),
            grant_types: vec![GrantType::DeviceCode],
            redirect_uris: vec![],
            scopes: vec![],
            token_auth_method: TokenAuthMethod::None,
            confidential: false,
            active: true,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            pkce_required: None,
        };
        let resolver = Arc::new(TenantResolver::new(
            Arc::new(NoContext),
            Arc::new(NoMemberships),
            TenantConfig::default(),
        ));
        let service = DeviceFlowService::new(
            Arc::new(SingleClientStore(client)),
            Arc::new(SaturatedDeviceStore),
            resolver,
            AuthConfig::default(),
        );

        let err = service.begin("tv-app", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal { .. }));
    }
}
