//! Revoked access token (jti) storage.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::AuthError;

/// Denylist of revoked access token IDs.
///
/// Access tokens are self-contained JWTs; revoking one means recording its
/// `jti` until the token would have expired anyway. Used when an
/// authorization code replay invalidates the tokens from the first
/// exchange.
#[async_trait]
pub trait RevokedTokenStorage: Send + Sync {
    /// Records a revoked `jti`, retained until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn revoke(&self, jti: &str, expires_at: OffsetDateTime) -> Result<(), AuthError>;

    /// Checks whether a `jti` has been revoked.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError>;

    /// Deletes entries whose retention window has passed, returning how
    /// many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn cleanup_expired(&self) -> Result<u64, AuthError>;
}
