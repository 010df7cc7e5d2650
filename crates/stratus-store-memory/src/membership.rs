//! In-memory membership store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use stratus_auth::error::AuthError;
use stratus_auth::storage::MembershipStorage;
use stratus_auth::types::Membership;

/// In-memory membership store.
///
/// Populated at bootstrap; the authorization core only reads it, but
/// `add`/`remove` are exposed so tests can model membership changes.
#[derive(Default)]
pub struct MemoryMembershipStore {
    memberships: RwLock<Vec<Membership>>,
}

impl MemoryMembershipStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a membership.
    pub async fn add(&self, membership: Membership) {
        let mut memberships = self.memberships.write().await;
        memberships
            .retain(|m| !(m.user_id == membership.user_id && m.org_id == membership.org_id));
        memberships.push(membership);
    }

    /// Removes a membership, returning whether one existed.
    pub async fn remove(&self, user_id: &str, org_id: &str) -> bool {
        let mut memberships = self.memberships.write().await;
        let before = memberships.len();
        memberships.retain(|m| !(m.user_id == user_id && m.org_id == org_id));
        memberships.len() != before
    }
}

#[async_trait]
impl MembershipStorage for MemoryMembershipStore {
    async fn find_membership(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Option<Membership>, AuthError> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .find(|m| m.user_id == user_id && m.org_id == org_id)
            .cloned())
    }

    async fn memberships_for_user(&self, user_id: &str) -> Result<Vec<Membership>, AuthError> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }
}
