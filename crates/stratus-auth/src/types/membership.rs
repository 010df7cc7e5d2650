//! Organization membership types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Role a user holds within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    /// Full administrative control over the organization.
    Owner,
    /// Can manage members and settings.
    Admin,
    /// Regular member.
    Member,
}

impl OrgRole {
    /// Returns the role name as used in token claims.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's membership in an organization.
///
/// Memberships are the source of truth for tenant access. Every tenant
/// selection, whether by explicit switch or token issuance, is checked
/// against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// The member's user ID.
    pub user_id: String,

    /// The organization ID.
    pub org_id: String,

    /// Human-readable organization name (surfaced in ID token claims).
    pub org_name: String,

    /// The member's role in this organization.
    pub role: OrgRole,

    /// When the membership was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(OrgRole::Owner.as_str(), "owner");
        assert_eq!(OrgRole::Admin.as_str(), "admin");
        assert_eq!(OrgRole::Member.as_str(), "member");
    }

    #[test]
    fn test_serde_roundtrip() {
        let membership = Membership {
            user_id: "user-1".to_string(),
            org_id: "org-acme".to_string(),
            org_name: "Acme Corp".to_string(),
            role: OrgRole::Admin,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&membership).unwrap();
        let parsed: Membership = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.org_id, "org-acme");
        assert_eq!(parsed.role, OrgRole::Admin);
    }
}
