//! In-memory client registry.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use stratus_auth::error::AuthError;
use stratus_auth::storage::ClientStorage;
use stratus_auth::types::Client;

/// In-memory client registry.
#[derive(Default)]
pub struct MemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl MemoryClientStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStore {
    async fn register(&self, client: Client) -> Result<(), AuthError> {
        let mut clients = self.clients.write().await;
        clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>, AuthError> {
        let clients = self.clients.read().await;
        Ok(clients.get(client_id).cloned())
    }
}
