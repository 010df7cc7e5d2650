//! Refresh token records.
//!
//! Refresh tokens are opaque random strings. Only a SHA-256 digest is
//! persisted, so a storage compromise does not leak usable tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// A stored refresh token record, keyed by token digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Base64url SHA-256 digest of the token string.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Subject (user) the token was issued for.
    pub user_id: String,

    /// Tenant the token was issued under. Carried forward so refresh
    /// exchanges stay pinned to the same tenant unless the membership
    /// has been revoked in the meantime.
    pub tenant_id: String,

    /// Scope granted at issuance.
    pub scope: String,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RefreshToken {
    /// Checks if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}

/// Computes the base64url SHA-256 digest of a token string.
///
/// Used both at issuance (to key the record) and at exchange (to look the
/// record up without ever storing the plaintext token).
#[must_use]
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
