//! Device authorization storage.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::oauth::device::{DeviceAuthorization, DeviceStatus};

/// Result of applying a user decision to a device authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceDecision {
    /// The decision was applied; the request was still pending.
    Applied,
    /// A decision had already been recorded. The first decision stands.
    AlreadyDecided(DeviceStatus),
    /// No pending request for that user code.
    NotFound,
}

/// Result of a device poll, with pacing applied.
#[derive(Debug, Clone)]
pub struct DevicePoll {
    /// The record as of this poll, after any interval update.
    pub record: DeviceAuthorization,
    /// Whether this poll arrived before the required interval elapsed.
    pub too_fast: bool,
}

/// Storage for device authorization requests (RFC 8628).
#[async_trait]
pub trait DeviceAuthorizationStorage: Send + Sync {
    /// Stores a newly created request.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn create(&self, record: DeviceAuthorization) -> Result<(), AuthError>;

    /// Looks up a request by user code (normalized form).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn find_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceAuthorization>, AuthError>;

    /// Atomically approves a pending request.
    ///
    /// The approval records who approved and under which tenant. Must be a
    /// check-and-set on `status == Pending`: concurrent approve/deny calls
    /// resolve to exactly one applied decision.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn approve(
        &self,
        user_code: &str,
        user_id: &str,
        approved_org: &str,
    ) -> Result<DeviceDecision, AuthError>;

    /// Atomically denies a pending request. Same check-and-set contract
    /// as [`approve`](Self::approve).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn deny(&self, user_code: &str, user_id: &str) -> Result<DeviceDecision, AuthError>;

    /// Atomically records a poll by device code.
    ///
    /// Updates `last_polled_at`, and when the poll arrives before the
    /// required interval has elapsed, adds the given penalty to the
    /// interval. The pacing check and update happen under one guard so
    /// concurrent polls are paced consistently.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn poll(
        &self,
        device_code: &str,
        slow_down_penalty_secs: u64,
    ) -> Result<Option<DevicePoll>, AuthError>;

    /// Removes a request, typically after a terminal-state exchange.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn delete(&self, device_code: &str) -> Result<(), AuthError>;

    /// Deletes expired requests, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn cleanup_expired(&self) -> Result<u64, AuthError>;
}
