//! In-memory tenant context store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use stratus_auth::error::AuthError;
use stratus_auth::storage::TenantContextStorage;
use stratus_auth::tenant::context::TenantContextEntry;

/// In-memory tenant context store, keyed by user ID.
///
/// Expired entries are treated as absent on read (lazy expiry) and
/// reclaimed by `cleanup_expired`.
#[derive(Default)]
pub struct MemoryTenantContextStore {
    entries: RwLock<HashMap<String, TenantContextEntry>>,
}

impl MemoryTenantContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantContextStorage for MemoryTenantContextStore {
    async fn set(&self, entry: TenantContextEntry) -> Result<(), AuthError> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.user_id.clone(), entry);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<TenantContextEntry>, AuthError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(user_id)
            .filter(|entry| !entry.is_expired())
            .cloned())
    }

    async fn remove(&self, user_id: &str) -> Result<(), AuthError> {
        let mut entries = self.entries.write().await;
        entries.remove(user_id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::OffsetDateTime;

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = MemoryTenantContextStore::new();
        let ttl = Duration::from_secs(300);

        store
            .set(TenantContextEntry::new("user-1", "org-acme", ttl))
            .await
            .unwrap();
        store
            .set(TenantContextEntry::new("user-1", "org-beta", ttl))
            .await
            .unwrap();

        let entry = store.get("user-1").await.unwrap().unwrap();
        assert_eq!(entry.org_id, "org-beta");
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let store = MemoryTenantContextStore::new();
        let mut entry = TenantContextEntry::new("user-1", "org-acme", Duration::from_secs(300));
        entry.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        store.set(entry).await.unwrap();

        assert!(store.get("user-1").await.unwrap().is_none());

        // Still physically present until cleanup reclaims it
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryTenantContextStore::new();
        store
            .set(TenantContextEntry::new(
                "user-1",
                "org-acme",
                Duration::from_secs(300),
            ))
            .await
            .unwrap();

        store.remove("user-1").await.unwrap();
        assert!(store.get("user-1").await.unwrap().is_none());
    }
}
