//! Multi-tenant context resolution and isolation.

pub mod context;
pub mod guard;

pub use context::{ResolvedTenant, TenantContextEntry, TenantResolver};
pub use guard::MembershipGuard;
