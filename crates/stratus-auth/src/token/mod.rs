//! Token issuance and validation.

pub mod jwt;
pub mod service;

pub use jwt::{
    AccessTokenClaims, IdTokenClaims, Jwk, Jwks, JwtError, JwtService, SessionClaims,
    SigningKeyPair,
};
pub use service::TokenService;
