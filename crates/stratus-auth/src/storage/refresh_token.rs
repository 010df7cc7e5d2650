//! Refresh token storage.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::types::RefreshToken;

/// Storage for refresh token records, keyed by token digest.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a newly issued refresh token record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn store(&self, token: RefreshToken) -> Result<(), AuthError>;

    /// Looks up a record by token digest.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AuthError>;

    /// Revokes (removes) a record by digest. Returns whether a record
    /// existed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn revoke(&self, token_hash: &str) -> Result<bool, AuthError>;

    /// Deletes expired records, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn cleanup_expired(&self) -> Result<u64, AuthError>;
}
