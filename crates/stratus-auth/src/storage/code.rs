//! Authorization code storage.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::oauth::code::AuthorizationCode;

/// Result of attempting to consume an authorization code.
///
/// Distinguishes first use from replay so the caller can revoke the tokens
/// issued by the first exchange when a replay is detected.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// First use. The returned record is marked consumed as of this call.
    Consumed(AuthorizationCode),
    /// The code was already consumed. The record carries the issuance
    /// markers (`issued_jti`, `issued_refresh_hash`) to revoke.
    Replayed(AuthorizationCode),
    /// The code exists but has expired unconsumed.
    Expired,
    /// No such code.
    NotFound,
}

/// Storage for authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Stores a newly issued code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn store(&self, code: AuthorizationCode) -> Result<(), AuthError>;

    /// Atomically consumes a code.
    ///
    /// This must be a linearizable check-and-set: of any number of
    /// concurrent calls with the same code value, exactly one observes
    /// `Consumed` and the rest observe `Replayed`. Consumed records are
    /// retained until expiry so replays stay detectable.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn consume(&self, code: &str) -> Result<ConsumeOutcome, AuthError>;

    /// Records the tokens issued by the successful exchange of a code, so
    /// a later replay can revoke them.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn attach_issuance(
        &self,
        code: &str,
        issued_jti: &str,
        issued_refresh_hash: Option<&str>,
    ) -> Result<(), AuthError>;

    /// Deletes expired codes, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn cleanup_expired(&self) -> Result<u64, AuthError>;
}
