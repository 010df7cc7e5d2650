//! In-memory authorization code store.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use stratus_auth::error::AuthError;
use stratus_auth::oauth::code::AuthorizationCode;
use stratus_auth::storage::{AuthorizationCodeStorage, ConsumeOutcome};

/// In-memory authorization code store.
///
/// Consumption is a check-and-set under the write guard, so concurrent
/// exchanges of the same code resolve to exactly one `Consumed`.
#[derive(Default)]
pub struct MemoryAuthorizationCodeStore {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl MemoryAuthorizationCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for MemoryAuthorizationCodeStore {
    async fn store(&self, code: AuthorizationCode) -> Result<(), AuthError> {
        let mut codes = self.codes.write().await;
        codes.insert(code.code.clone(), code);
        Ok(())
    }

    async fn consume(&self, code: &str) -> Result<ConsumeOutcome, AuthError> {
        let mut codes = self.codes.write().await;

        let Some(record) = codes.get_mut(code) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        // Consumed-ness wins over expiry: a replay of a consumed code must
        // be recognized as a replay even after the code's lifetime passed
        if record.is_consumed() {
            return Ok(ConsumeOutcome::Replayed(record.clone()));
        }

        if record.is_expired() {
            codes.remove(code);
            return Ok(ConsumeOutcome::Expired);
        }

        record.consumed_at = Some(OffsetDateTime::now_utc());
        Ok(ConsumeOutcome::Consumed(record.clone()))
    }

    async fn attach_issuance(
        &self,
        code: &str,
        issued_jti: &str,
        issued_refresh_hash: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut codes = self.codes.write().await;
        if let Some(record) = codes.get_mut(code) {
            record.issued_jti = Some(issued_jti.to_string());
            record.issued_refresh_hash = issued_refresh_hash.map(ToString::to_string);
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|_, record| !record.is_expired());
        Ok((before - codes.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::Duration;

    fn make_code(value: &str, lifetime_secs: i64) -> AuthorizationCode {
        let now = OffsetDateTime::now_utc();
        AuthorizationCode {
            code: value.to_string(),
            client_id: "web-app".to_string(),
            user_id: "user-1".to_string(),
            redirect_uri: "https://app.example/callback".to_string(),
            scope: "openid".to_string(),
            tenant_id: "org-acme".to_string(),
            code_challenge: Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string()),
            nonce: None,
            auth_time: now,
            expires_at: now + Duration::seconds(lifetime_secs),
            created_at: now,
            consumed_at: None,
            issued_jti: None,
            issued_refresh_hash: None,
        }
    }

    #[tokio::test]
    async fn test_consume_once_then_replay() {
        let store = MemoryAuthorizationCodeStore::new();
        store.store(make_code("abc", 60)).await.unwrap();

        let first = store.consume("abc").await.unwrap();
        assert!(matches!(first, ConsumeOutcome::Consumed(_)));

        let second = store.consume("abc").await.unwrap();
        assert!(matches!(second, ConsumeOutcome::Replayed(_)));
    }

    #[tokio::test]
    async fn test_consume_unknown_and_expired() {
        let store = MemoryAuthorizationCodeStore::new();
        assert!(matches!(
            store.consume("missing").await.unwrap(),
            ConsumeOutcome::NotFound
        ));

        store.store(make_code("old", -1)).await.unwrap();
        assert!(matches!(
            store.consume("old").await.unwrap(),
            ConsumeOutcome::Expired
        ));
        // Expired codes are removed on the failed consume
        assert!(matches!(
            store.consume("old").await.unwrap(),
            ConsumeOutcome::NotFound
        ));
    }

    #[tokio::test]
    async fn test_replay_carries_issuance_markers() {
        let store = MemoryAuthorizationCodeStore::new();
        store.store(make_code("abc", 60)).await.unwrap();

        let _ = store.consume("abc").await.unwrap();
        store
            .attach_issuance("abc", "jti-1", Some("hash-1"))
            .await
            .unwrap();

        match store.consume("abc").await.unwrap() {
            ConsumeOutcome::Replayed(record) => {
                assert_eq!(record.issued_jti.as_deref(), Some("jti-1"));
                assert_eq!(record.issued_refresh_hash.as_deref(), Some("hash-1"));
            }
            other => panic!("expected replay, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_consume_single_winner() {
        let store = Arc::new(MemoryAuthorizationCodeStore::new());
        store.store(make_code("abc", 60)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(
                async move { store.consume("abc").await.unwrap() },
            ));
        }

        let mut consumed = 0;
        let mut replayed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                ConsumeOutcome::Consumed(_) => consumed += 1,
                ConsumeOutcome::Replayed(_) => replayed += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(consumed, 1);
        assert_eq!(replayed, 15);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryAuthorizationCodeStore::new();
        store.store(make_code("live", 60)).await.unwrap();
        store.store(make_code("dead", -1)).await.unwrap();

        let removed = store.cleanup_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(matches!(
            store.consume("live").await.unwrap(),
            ConsumeOutcome::Consumed(_)
        ));
    }
}
