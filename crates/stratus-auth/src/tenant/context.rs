//! Tenant context entries and resolution.
//!
//! When a user switches organizations in the browser, the switch must be
//! visible to the next back-channel token exchange even though the two
//! requests share no HTTP state. The bridge is a short-lived context entry
//! keyed by user ID: the switch writes it, token issuance reads it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use crate::config::TenantConfig;
use crate::error::AuthError;
use crate::storage::{MembershipStorage, TenantContextStorage};
use crate::types::OrgRole;

// =============================================================================
// Context Entry
// =============================================================================

/// A short-lived record of a user's most recent organization selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContextEntry {
    /// The user who made the selection.
    pub user_id: String,

    /// The selected organization.
    pub org_id: String,

    /// When the entry stops being honored.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the entry was written.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TenantContextEntry {
    /// Creates an entry valid for `ttl` from now.
    #[must_use]
    pub fn new(user_id: impl Into<String>, org_id: impl Into<String>, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Checks if the entry has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}

// =============================================================================
// Resolved Tenant
// =============================================================================

/// The tenant a token issuance operates under, with the claim material
/// derived from the user's memberships.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    /// The tenant (organization) the tokens are scoped to.
    pub tenant_id: String,

    /// The user's role in that tenant.
    pub role: OrgRole,

    /// All organization IDs the user belongs to.
    pub organization_ids: Vec<String>,

    /// Display names matching `organization_ids`, for ID token claims.
    pub organization_names: Vec<String>,
}

// =============================================================================
// Tenant Resolver
// =============================================================================

/// Resolves which tenant a token issuance should be scoped to.
///
/// Resolution priority:
///
/// 1. A live tenant-context entry for the user
/// 2. The organization carried by the caller's session or stored grant
/// 3. The user's personal tenant (derived from the user ID)
///
/// A candidate from source 1 or 2 is only honored if the user is currently
/// a member of that organization; otherwise resolution falls through to the
/// next source with a warning. Tokens never name a tenant the user cannot
/// access.
pub struct TenantResolver {
    contexts: Arc<dyn TenantContextStorage>,
    memberships: Arc<dyn MembershipStorage>,
    config: TenantConfig,
}

impl TenantResolver {
    /// Creates a new resolver.
    #[must_use]
    pub fn new(
        contexts: Arc<dyn TenantContextStorage>,
        memberships: Arc<dyn MembershipStorage>,
        config: TenantConfig,
    ) -> Self {
        Self {
            contexts,
            memberships,
            config,
        }
    }

    /// Returns the user's personal tenant ID.
    #[must_use]
    pub fn personal_tenant_id(&self, user_id: &str) -> String {
        format!("{}{user_id}", self.config.default_org_prefix)
    }

    /// Resolves the tenant for a token issuance.
    ///
    /// `session_org` is the organization carried by the issuing context
    /// (the browser session for a code exchange, the stored tenant for a
    /// refresh, the approval for a device exchange), consulted when no
    /// live context entry applies.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if a backend lookup fails.
    pub async fn resolve(
        &self,
        user_id: &str,
        session_org: Option<&str>,
    ) -> Result<ResolvedTenant, AuthError> {
        let memberships = self.memberships.memberships_for_user(user_id).await?;

        // 1. Live context entry, if the membership still holds
        if let Some(entry) = self.contexts.get(user_id).await? {
            if let Some(m) = memberships.iter().find(|m| m.org_id == entry.org_id) {
                return Ok(self.build(user_id, &entry.org_id, m.role, &memberships));
            }
            warn!(
                user_id = %user_id,
                org_id = %entry.org_id,
                "tenant context entry names an organization the user is not a member of, falling back"
            );
        }

        // 2. Session organization, if the membership still holds
        if let Some(org_id) = session_org {
            if let Some(m) = memberships.iter().find(|m| m.org_id == org_id) {
                return Ok(self.build(user_id, org_id, m.role, &memberships));
            }
            warn!(
                user_id = %user_id,
                org_id = %org_id,
                "session organization membership no longer holds, falling back to personal tenant"
            );
        }

        // 3. Personal tenant
        let tenant_id = self.personal_tenant_id(user_id);
        Ok(self.build(user_id, &tenant_id, OrgRole::Owner, &memberships))
    }

    fn build(
        &self,
        user_id: &str,
        tenant_id: &str,
        role: OrgRole,
        memberships: &[crate::types::Membership],
    ) -> ResolvedTenant {
        let mut organization_ids: Vec<String> =
            memberships.iter().map(|m| m.org_id.clone()).collect();
        let mut organization_names: Vec<String> =
            memberships.iter().map(|m| m.org_name.clone()).collect();

        // The personal tenant is always listed, even with zero memberships
        let personal = self.personal_tenant_id(user_id);
        if !organization_ids.contains(&personal) {
            organization_ids.push(personal);
            organization_names.push("Personal".to_string());
        }

        ResolvedTenant {
            tenant_id: tenant_id.to_string(),
            role,
            organization_ids,
            organization_names,
        }
    }
}
