//! Tenant context hand-off storage.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::tenant::context::TenantContextEntry;

/// Storage for short-lived tenant-context entries.
///
/// An entry records "user U most recently selected organization O" with a
/// TTL. It bridges the gap between an organization switch in the browser
/// and the back-channel token exchange that should observe it.
#[async_trait]
pub trait TenantContextStorage: Send + Sync {
    /// Stores an entry, replacing any existing entry for the same user.
    /// Last writer wins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn set(&self, entry: TenantContextEntry) -> Result<(), AuthError>;

    /// Returns the live entry for a user, if any.
    ///
    /// Expired entries are treated as absent (lazy expiry); whether the
    /// implementation deletes them on read is its own business.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn get(&self, user_id: &str) -> Result<Option<TenantContextEntry>, AuthError>;

    /// Removes the entry for a user, if present.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn remove(&self, user_id: &str) -> Result<(), AuthError>;

    /// Deletes expired entries, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn cleanup_expired(&self) -> Result<u64, AuthError>;
}
