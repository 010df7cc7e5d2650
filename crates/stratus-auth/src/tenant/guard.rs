//! Tenant isolation guard.

use std::sync::Arc;

use tracing::debug;

use crate::error::AuthError;
use crate::storage::MembershipStorage;
use crate::types::Membership;

/// Enforces tenant isolation on resource access.
///
/// Two distinct failure shapes, on purpose:
///
/// - Acting on an organization you are not a member of is `Forbidden`
///   (the organization's existence is public to its would-be members,
///   e.g. when switching tenants).
/// - Reading a resource that lives in another tenant is `NotFound`,
///   byte-identical to a genuinely missing resource, so probing cannot
///   reveal whether the resource exists.
pub struct MembershipGuard {
    memberships: Arc<dyn MembershipStorage>,
}

impl MembershipGuard {
    /// Creates a new guard.
    #[must_use]
    pub fn new(memberships: Arc<dyn MembershipStorage>) -> Self {
        Self { memberships }
    }

    /// Requires that the user is a member of the organization.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` if the user is not a member, or
    /// `AuthError::Storage` if the lookup fails.
    pub async fn require_member(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Membership, AuthError> {
        match self.memberships.find_membership(user_id, org_id).await? {
            Some(membership) => Ok(membership),
            None => {
                debug!(user_id = %user_id, org_id = %org_id, "membership check failed");
                Err(AuthError::forbidden(format!(
                    "User is not a member of organization '{org_id}'"
                )))
            }
        }
    }

    /// Resolves a resource lookup under tenant isolation.
    ///
    /// `resource` is the raw lookup result paired with the tenant it
    /// belongs to. Both a missing resource and a resource in a tenant the
    /// caller is not a member of resolve to `NotFound`, so the two cases
    /// cannot be told apart from the outside.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` as described, or `AuthError::Storage`
    /// if the membership lookup fails.
    pub async fn resolve_resource<T>(
        &self,
        user_id: &str,
        resource: Option<(T, String)>,
    ) -> Result<T, AuthError> {
        let Some((resource, resource_org)) = resource else {
            return Err(AuthError::NotFound);
        };

        if self.memberships.is_member(user_id, &resource_org).await? {
            Ok(resource)
        } else {
            debug!(
                user_id = %user_id,
                org_id = %resource_org,
                "cross-tenant resource access hidden as not found"
            );
            Err(AuthError::NotFound)
        }
    }
}
