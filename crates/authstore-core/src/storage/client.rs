//! Registered-client repository trait.
//!
//! Defines the interface for client registration persistence.
//! Implementations are provided by storage backends (in-memory, PostgreSQL).

use async_trait::async_trait;

use crate::StoreResult;
use crate::types::ClientRegistration;

/// Storage operations for OAuth 2.0 client registrations.
///
/// # Example
///
/// ```ignore
/// use authstore_core::storage::RegisteredClientRepository;
///
/// async fn example(repo: &dyn RegisteredClientRepository) -> StoreResult<()> {
///     if let Some(client) = repo.find_by_client_id("demo-client").await? {
///         println!("registered as {}", client.id);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RegisteredClientRepository: Send + Sync {
    /// Inserts or replaces the registration with the same `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `id` or `client_id` is empty (`InvalidInput`)
    /// - `client_id` is already registered under a different `id`
    ///   (`UniquenessViolation`)
    /// - settings fail to encode or the backend fails
    async fn save(&self, client: &ClientRegistration) -> StoreResult<()>;

    /// Finds a registration by its internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or stored data cannot be decoded.
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<ClientRegistration>>;

    /// Finds a registration by its public client identifier (indexed).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or stored data cannot be decoded.
    async fn find_by_client_id(&self, client_id: &str) -> StoreResult<Option<ClientRegistration>>;

    /// Deletes a registration. Deleting an unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn remove(&self, id: &str) -> StoreResult<()>;
}
