//! OAuth 2.0 / OIDC authorization core for the Stratus SSO platform.
//!
//! This crate implements the protocol side of a multi-tenant single
//! sign-on service:
//!
//! - Authorization code grant with mandatory PKCE (S256)
//! - Device authorization grant (RFC 8628)
//! - Refresh token rotation
//! - RS256 JWT issuance with tenant-scoped claims
//! - TTL-bounded tenant-context hand-off between the browser and the
//!   back channel
//! - Membership-based tenant isolation with existence hiding
//!
//! Storage is abstracted behind async traits in [`storage`]; see the
//! `stratus-store-memory` crate for the in-memory backends.

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod tenant;
pub mod token;
pub mod types;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorCategory};

/// Convenient result alias for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;
