//! In-memory storage backends for the Stratus authorization core.
//!
//! Every store is a `tokio::sync::RwLock` over a `HashMap`, with the
//! check-and-set operations (code consumption, device decisions, poll
//! pacing) performed under the write guard so the atomicity contracts of
//! the storage traits hold.
//!
//! Suitable for tests and single-node deployments; state does not survive
//! a restart.

pub mod client;
pub mod code;
pub mod device;
pub mod membership;
pub mod refresh_token;
pub mod revoked_token;
pub mod tenant_context;

pub use client::MemoryClientStore;
pub use code::MemoryAuthorizationCodeStore;
pub use device::MemoryDeviceStore;
pub use membership::MemoryMembershipStore;
pub use refresh_token::MemoryRefreshTokenStore;
pub use revoked_token::MemoryRevokedTokenStore;
pub use tenant_context::MemoryTenantContextStore;
