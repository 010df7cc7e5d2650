//! Authorization code records.
//!
//! Codes are single-use, short-lived credentials binding an authenticated
//! browser session to a token-endpoint exchange. Consumed codes are retained
//! until expiry so a replay can be recognized and the tokens issued by the
//! first exchange revoked.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A stored authorization code record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The opaque code value handed to the client via redirect.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Authenticated user the code represents.
    pub user_id: String,

    /// Redirect URI used in the authorization request. The token exchange
    /// must present the identical value.
    pub redirect_uri: String,

    /// Granted scope (space-separated).
    pub scope: String,

    /// Tenant resolved at authorization time. Pinned into the code so the
    /// token exchange issues claims for the tenant the user saw.
    pub tenant_id: String,

    /// PKCE code challenge (base64url S256 digest). Absent only for
    /// confidential clients registered without a PKCE requirement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// OIDC nonce from the authorization request, echoed into the ID token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// When the user authenticated (ID token `auth_time`).
    #[serde(with = "time::serde::rfc3339")]
    pub auth_time: OffsetDateTime,

    /// When the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code was consumed, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<OffsetDateTime>,

    /// `jti` of the access token issued by the first exchange. Recorded so
    /// a replayed code can revoke it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_jti: Option<String>,

    /// Digest of the refresh token issued by the first exchange, for the
    /// same revoke-on-replay purpose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_refresh_hash: Option<String>,
}

impl AuthorizationCode {
    /// Checks if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Checks if the code has already been consumed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

/// Generates a random authorization code.
///
/// 32 random bytes, base64url encoded (43 characters, 256 bits of entropy).
#[must_use]
pub fn generate_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
