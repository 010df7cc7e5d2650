//! Storage trait definitions.
//!
//! Every persistence concern of the authorization core is expressed as an
//! async trait so backends can be swapped (in-memory for tests and small
//! deployments, a database for production). Traits whose operations must be
//! atomic say so on the operation; implementations must honor those
//! contracts or the protocol guarantees (single-use codes, poll pacing,
//! last-writer-wins context entries) break.

pub mod client;
pub mod code;
pub mod device;
pub mod membership;
pub mod refresh_token;
pub mod revoked_token;
pub mod tenant_context;

pub use client::ClientStorage;
pub use code::{AuthorizationCodeStorage, ConsumeOutcome};
pub use device::{DeviceAuthorizationStorage, DeviceDecision, DevicePoll};
pub use membership::MembershipStorage;
pub use refresh_token::RefreshTokenStorage;
pub use revoked_token::RevokedTokenStorage;
pub use tenant_context::TenantContextStorage;
