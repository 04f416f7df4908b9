//! In-memory client registry.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use authstore_core::codec::{ensure_encodable, ensure_instant_encodable};
use authstore_core::storage::RegisteredClientRepository;
use authstore_core::types::ClientRegistration;
use authstore_core::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct ClientTable {
    /// Registrations by internal id.
    by_id: HashMap<String, ClientRegistration>,
    /// Unique index: public client identifier -> internal id.
    by_client_id: HashMap<String, String>,
}

/// Client registry backed by a hash map with a unique `client_id` index.
///
/// Both maps sit behind one lock so the uniqueness check and the write
/// happen atomically.
#[derive(Debug, Default)]
pub struct InMemoryClientRepository {
    table: RwLock<ClientTable>,
}

impl InMemoryClientRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize {
        self.table.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RegisteredClientRepository for InMemoryClientRepository {
    async fn save(&self, client: &ClientRegistration) -> StoreResult<()> {
        client.validate().map_err(StoreError::invalid_input)?;
        ensure_encodable(client.client_settings.as_map())?;
        ensure_encodable(client.token_settings.as_map())?;
        for at in [client.client_id_issued_at, client.client_secret_expires_at]
            .into_iter()
            .flatten()
        {
            ensure_instant_encodable(at)?;
        }

        let mut guard = self.table.write().await;
        let ClientTable {
            by_id,
            by_client_id,
        } = &mut *guard;

        if let Some(owner) = by_client_id.get(&client.client_id)
            && owner != &client.id
        {
            warn!(id = %client.id, "client_id already registered to another client");
            return Err(StoreError::uniqueness("client", "client_id"));
        }

        if let Some(previous) = by_id.get(&client.id)
            && previous.client_id != client.client_id
        {
            by_client_id.remove(&previous.client_id);
        }

        by_client_id.insert(client.client_id.clone(), client.id.clone());
        by_id.insert(client.id.clone(), client.clone());

        debug!(id = %client.id, client_id = %client.client_id, "Saved client registration");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<ClientRegistration>> {
        Ok(self.table.read().await.by_id.get(id).cloned())
    }

    async fn find_by_client_id(&self, client_id: &str) -> StoreResult<Option<ClientRegistration>> {
        let table = self.table.read().await;
        Ok(table
            .by_client_id
            .get(client_id)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        let mut guard = self.table.write().await;
        let ClientTable {
            by_id,
            by_client_id,
        } = &mut *guard;

        if let Some(removed) = by_id.remove(id) {
            by_client_id.remove(&removed.client_id);
            debug!(id, "Removed client registration");
        }
        Ok(())
    }
}
