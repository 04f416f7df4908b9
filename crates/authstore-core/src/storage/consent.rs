//! Authorization consent service trait.
//!
//! Consents are keyed by `(registered_client_id, principal_name)`. Saving an
//! existing key replaces its authorities; removing a missing key is a no-op.

use async_trait::async_trait;

use crate::StoreResult;
use crate::types::ConsentRecord;

/// Storage trait for consent records.
#[async_trait]
pub trait AuthorizationConsentService: Send + Sync {
    /// Inserts or replaces the consent for its composite key.
    ///
    /// # Errors
    ///
    /// Returns an error if a key field is empty or the backend fails.
    async fn save(&self, consent: &ConsentRecord) -> StoreResult<()>;

    /// Finds the consent for a client and principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or stored data cannot be decoded.
    async fn find_by_id(
        &self,
        registered_client_id: &str,
        principal_name: &str,
    ) -> StoreResult<Option<ConsentRecord>>;

    /// Lists all consents granted by a principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or stored data cannot be decoded.
    async fn find_by_principal(&self, principal_name: &str) -> StoreResult<Vec<ConsentRecord>>;

    /// Deletes the consent for a client and principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn remove_by_id(&self, registered_client_id: &str, principal_name: &str)
    -> StoreResult<()>;

    /// Deletes the given consent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn remove(&self, consent: &ConsentRecord) -> StoreResult<()> {
        self.remove_by_id(&consent.registered_client_id, &consent.principal_name)
            .await
    }
}
