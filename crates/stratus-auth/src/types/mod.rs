//! Domain types for the authorization core.

pub mod client;
pub mod membership;
pub mod refresh_token;

pub use client::{Client, ClientValidationError, GrantType, TokenAuthMethod};
pub use membership::{Membership, OrgRole};
pub use refresh_token::RefreshToken;
