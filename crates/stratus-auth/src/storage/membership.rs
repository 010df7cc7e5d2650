//! Organization membership storage.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::types::Membership;

/// Read-only view over organization memberships.
///
/// Membership lifecycle (invites, removal) is owned by a separate system;
/// the authorization core only queries it.
#[async_trait]
pub trait MembershipStorage: Send + Sync {
    /// Looks up a user's membership in a specific organization.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn find_membership(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Option<Membership>, AuthError>;

    /// Lists all memberships for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn memberships_for_user(&self, user_id: &str) -> Result<Vec<Membership>, AuthError>;

    /// Checks whether a user is a member of an organization.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn is_member(&self, user_id: &str, org_id: &str) -> Result<bool, AuthError> {
        Ok(self.find_membership(user_id, org_id).await?.is_some())
    }
}
