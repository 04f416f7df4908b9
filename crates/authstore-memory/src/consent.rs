//! In-memory consent records.

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use tracing::debug;

use authstore_core::storage::AuthorizationConsentService;
use authstore_core::types::ConsentRecord;
use authstore_core::{StoreError, StoreResult};

/// Composite key: (registered client id, principal name).
pub type ConsentKey = (String, String);

fn consent_key(registered_client_id: &str, principal_name: &str) -> ConsentKey {
    (registered_client_id.to_string(), principal_name.to_string())
}

/// Consent store using a papaya lock-free map.
///
/// A single key insert is atomic, which is all the upsert needs.
#[derive(Debug, Default)]
pub struct InMemoryConsentService {
    data: PapayaHashMap<ConsentKey, ConsentRecord>,
}

impl InMemoryConsentService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuthorizationConsentService for InMemoryConsentService {
    async fn save(&self, consent: &ConsentRecord) -> StoreResult<()> {
        consent.validate().map_err(StoreError::invalid_input)?;

        let key = consent_key(&consent.registered_client_id, &consent.principal_name);
        self.data.pin().insert(key, consent.clone());

        debug!(
            registered_client_id = %consent.registered_client_id,
            principal_name = %consent.principal_name,
            "Saved consent"
        );
        Ok(())
    }

    async fn find_by_id(
        &self,
        registered_client_id: &str,
        principal_name: &str,
    ) -> StoreResult<Option<ConsentRecord>> {
        let key = consent_key(registered_client_id, principal_name);
        Ok(self.data.pin().get(&key).cloned())
    }

    async fn find_by_principal(&self, principal_name: &str) -> StoreResult<Vec<ConsentRecord>> {
        let guard = self.data.pin();
        let mut consents: Vec<ConsentRecord> = guard
            .iter()
            .filter(|((_, principal), _)| principal == principal_name)
            .map(|(_, consent)| consent.clone())
            .collect();
        consents.sort_by(|a, b| a.registered_client_id.cmp(&b.registered_client_id));
        Ok(consents)
    }

    async fn remove_by_id(
        &self,
        registered_client_id: &str,
        principal_name: &str,
    ) -> StoreResult<()> {
        let key = consent_key(registered_client_id, principal_name);
        if self.data.pin().remove(&key).is_some() {
            debug!(registered_client_id, principal_name, "Removed consent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[tokio::test]
    async fn test_save_is_upsert() {
        let service = InMemoryConsentService::new();
        service
            .save(&ConsentRecord::with_scopes("c1", "alice", ["read"]))
            .await
            .unwrap();
        service
            .save(&ConsentRecord::with_scopes("c1", "alice", ["read", "write"]))
            .await
            .unwrap();

        assert_eq!(service.len(), 1);
        let found = service.find_by_id("c1", "alice").await.unwrap().unwrap();
        assert_eq!(
            found.scopes(),
            BTreeSet::from(["read".to_string(), "write".to_string()])
        );
    }

    #[tokio::test]
    async fn test_later_save_can_shrink_scopes() {
        let service = InMemoryConsentService::new();
        service
            .save(&ConsentRecord::with_scopes("c1", "alice", ["read", "write"]))
            .await
            .unwrap();
        service
            .save(&ConsentRecord::with_scopes("c1", "alice", ["read"]))
            .await
            .unwrap();

        let found = service.find_by_id("c1", "alice").await.unwrap().unwrap();
        assert_eq!(found.scopes(), BTreeSet::from(["read".to_string()]));
    }

    #[tokio::test]
    async fn test_find_by_principal() {
        let service = InMemoryConsentService::new();
        for (client, principal) in [("c2", "alice"), ("c1", "alice"), ("c1", "bob")] {
            service
                .save(&ConsentRecord::with_scopes(client, principal, ["read"]))
                .await
                .unwrap();
        }

        let alice: Vec<String> = service
            .find_by_principal("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.registered_client_id)
            .collect();
        assert_eq!(alice, vec!["c1".to_string(), "c2".to_string()]);
        assert!(service.find_by_principal("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let service = InMemoryConsentService::new();
        let consent = ConsentRecord::with_scopes("c1", "alice", ["read"]);
        service.save(&consent).await.unwrap();

        service.remove(&consent).await.unwrap();
        service.remove(&consent).await.unwrap();
        service.remove_by_id("c9", "nobody").await.unwrap();
        assert!(service.is_empty());
        assert_eq!(service.find_by_id("c1", "alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_principal_rejected() {
        let service = InMemoryConsentService::new();
        let err = service
            .save(&ConsentRecord::new("c1", ""))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }
}
