//! In-memory revoked token denylist.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use stratus_auth::error::AuthError;
use stratus_auth::storage::RevokedTokenStorage;

/// In-memory denylist of revoked access token IDs.
#[derive(Default)]
pub struct MemoryRevokedTokenStore {
    revoked: RwLock<HashMap<String, OffsetDateTime>>,
}

impl MemoryRevokedTokenStore {
    /// Creates an empty denylist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevokedTokenStorage for MemoryRevokedTokenStore {
    async fn revoke(&self, jti: &str, expires_at: OffsetDateTime) -> Result<(), AuthError> {
        let mut revoked = self.revoked.write().await;
        revoked.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let revoked = self.revoked.read().await;
        Ok(revoked.contains_key(jti))
    }

    async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let now = OffsetDateTime::now_utc();
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at > now);
        Ok((before - revoked.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn test_revoke_and_check() {
        let store = MemoryRevokedTokenStore::new();
        let until = OffsetDateTime::now_utc() + Duration::hours(1);

        assert!(!store.is_revoked("jti-1").await.unwrap());
        store.revoke("jti-1", until).await.unwrap();
        assert!(store.is_revoked("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_entries() {
        let store = MemoryRevokedTokenStore::new();
        let now = OffsetDateTime::now_utc();
        store.revoke("old", now - Duration::seconds(1)).await.unwrap();
        store.revoke("new", now + Duration::hours(1)).await.unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert!(!store.is_revoked("old").await.unwrap());
        assert!(store.is_revoked("new").await.unwrap());
    }
}
