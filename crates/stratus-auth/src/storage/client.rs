//! Client registry storage.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::types::Client;

/// Storage for registered OAuth clients.
///
/// Clients are registered at bootstrap and read-mostly afterwards.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Registers a client, replacing any existing registration with the
    /// same `client_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn register(&self, client: Client) -> Result<(), AuthError>;

    /// Looks up a client by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>, AuthError>;
}
