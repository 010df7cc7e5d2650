//! In-memory device authorization store.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use stratus_auth::error::AuthError;
use stratus_auth::oauth::device::{DeviceAuthorization, DeviceStatus};
use stratus_auth::storage::{DeviceAuthorizationStorage, DeviceDecision, DevicePoll};

/// In-memory device authorization store, keyed by device code.
///
/// Decisions and poll pacing are check-and-set under the write guard.
#[derive(Default)]
pub struct MemoryDeviceStore {
    records: RwLock<HashMap<String, DeviceAuthorization>>,
}

impl MemoryDeviceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceAuthorizationStorage for MemoryDeviceStore {
    async fn create(&self, record: DeviceAuthorization) -> Result<(), AuthError> {
        let mut records = self.records.write().await;
        records.insert(record.device_code.clone(), record);
        Ok(())
    }

    async fn find_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceAuthorization>, AuthError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.user_code == user_code)
            .cloned())
    }

    async fn approve(
        &self,
        user_code: &str,
        user_id: &str,
        approved_org: &str,
    ) -> Result<DeviceDecision, AuthError> {
        let mut records = self.records.write().await;
        let Some(record) = records.values_mut().find(|r| r.user_code == user_code) else {
            return Ok(DeviceDecision::NotFound);
        };

        if record.status != DeviceStatus::Pending {
            return Ok(DeviceDecision::AlreadyDecided(record.status));
        }

        record.status = DeviceStatus::Approved;
        record.decided_by = Some(user_id.to_string());
        record.approved_org = Some(approved_org.to_string());
        Ok(DeviceDecision::Applied)
    }

    async fn deny(&self, user_code: &str, user_id: &str) -> Result<DeviceDecision, AuthError> {
        let mut records = self.records.write().await;
        let Some(record) = records.values_mut().find(|r| r.user_code == user_code) else {
            return Ok(DeviceDecision::NotFound);
        };

        if record.status != DeviceStatus::Pending {
            return Ok(DeviceDecision::AlreadyDecided(record.status));
        }

        record.status = DeviceStatus::Denied;
        record.decided_by = Some(user_id.to_string());
        Ok(DeviceDecision::Applied)
    }

    async fn poll(
        &self,
        device_code: &str,
        slow_down_penalty_secs: u64,
    ) -> Result<Option<DevicePoll>, AuthError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(device_code) else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();
        let too_fast = match record.last_polled_at {
            Some(last) => {
                let elapsed = (now - last).whole_seconds();
                elapsed >= 0 && (elapsed as u64) < record.interval_secs
            }
            None => false,
        };

        if too_fast {
            record.interval_secs += slow_down_penalty_secs;
        }
        record.last_polled_at = Some(now);

        Ok(Some(DevicePoll {
            record: record.clone(),
            too_fast,
        }))
    }

    async fn delete(&self, device_code: &str) -> Result<(), AuthError> {
        let mut records = self.records.write().await;
        records.remove(device_code);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired());
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn make_record(device_code: &str, user_code: &str) -> DeviceAuthorization {
        let now = OffsetDateTime::now_utc();
        DeviceAuthorization {
            device_code: device_code.to_string(),
            user_code: user_code.to_string(),
            client_id: "tv-app".to_string(),
            scope: "openid".to_string(),
            status: DeviceStatus::Pending,
            decided_by: None,
            approved_org: None,
            interval_secs: 5,
            last_polled_at: None,
            expires_at: now + Duration::minutes(10),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_first_decision_wins() {
        let store = MemoryDeviceStore::new();
        store.create(make_record("dc-1", "BCDF-GHJK")).await.unwrap();

        let approve = store
            .approve("BCDF-GHJK", "user-1", "org-acme")
            .await
            .unwrap();
        assert_eq!(approve, DeviceDecision::Applied);

        let deny = store.deny("BCDF-GHJK", "user-2").await.unwrap();
        assert_eq!(
            deny,
            DeviceDecision::AlreadyDecided(DeviceStatus::Approved)
        );

        let record = store.find_by_user_code("BCDF-GHJK").await.unwrap().unwrap();
        assert_eq!(record.status, DeviceStatus::Approved);
        assert_eq!(record.decided_by.as_deref(), Some("user-1"));
        assert_eq!(record.approved_org.as_deref(), Some("org-acme"));
    }

    #[tokio::test]
    async fn test_decision_on_unknown_code() {
        let store = MemoryDeviceStore::new();
        assert_eq!(
            store.approve("XXXX-XXXX", "user-1", "org").await.unwrap(),
            DeviceDecision::NotFound
        );
    }

    #[tokio::test]
    async fn test_poll_pacing_grows_interval() {
        let store = MemoryDeviceStore::new();
        store.create(make_record("dc-1", "BCDF-GHJK")).await.unwrap();

        // First poll is never too fast
        let first = store.poll("dc-1", 5).await.unwrap().unwrap();
        assert!(!first.too_fast);
        assert_eq!(first.record.interval_secs, 5);

        // Immediate second poll is premature and raises the interval
        let second = store.poll("dc-1", 5).await.unwrap().unwrap();
        assert!(second.too_fast);
        assert_eq!(second.record.interval_secs, 10);

        // And again, persisted across polls
        let third = store.poll("dc-1", 5).await.unwrap().unwrap();
        assert!(third.too_fast);
        assert_eq!(third.record.interval_secs, 15);
    }

    #[tokio::test]
    async fn test_poll_unknown_code() {
        let store = MemoryDeviceStore::new();
        assert!(store.poll("missing", 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_cleanup() {
        let store = MemoryDeviceStore::new();
        store.create(make_record("dc-1", "BCDF-GHJK")).await.unwrap();

        let mut expired = make_record("dc-2", "MNPQ-RSTV");
        expired.expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.create(expired).await.unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);

        store.delete("dc-1").await.unwrap();
        assert!(store.poll("dc-1", 5).await.unwrap().is_none());
    }
}
