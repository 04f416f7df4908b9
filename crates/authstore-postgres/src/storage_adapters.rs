//! Arc-owning storage adapters.
//!
//! These adapters wrap the lifetime-based storage types and own an
//! `Arc<PgPool>`, so they can be handed out as `Arc<dyn Trait>`.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use authstore_core::StoreResult;
use authstore_core::storage::{
    AuthorizationConsentService, AuthorizationService, RegisteredClientRepository,
};
use authstore_core::types::{AuthorizationRecord, ClientRegistration, ConsentRecord, TokenKind};

use crate::PgPool;
use crate::authorization::AuthorizationStorage;
use crate::client::ClientStorage;
use crate::consent::ConsentStorage;

// =============================================================================
// Arc-Owning Client Repository
// =============================================================================

/// Arc-owning PostgreSQL client repository.
#[derive(Debug, Clone)]
pub struct ArcClientRepository {
    pool: Arc<PgPool>,
}

impl ArcClientRepository {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegisteredClientRepository for ArcClientRepository {
    async fn save(&self, client: &ClientRegistration) -> StoreResult<()> {
        ClientStorage::new(&self.pool).save(client).await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<ClientRegistration>> {
        ClientStorage::new(&self.pool).find_by_id(id).await
    }

    async fn find_by_client_id(&self, client_id: &str) -> StoreResult<Option<ClientRegistration>> {
        ClientStorage::new(&self.pool)
            .find_by_client_id(client_id)
            .await
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        ClientStorage::new(&self.pool).remove(id).await?;
        Ok(())
    }
}

// =============================================================================
// Arc-Owning Authorization Service
// =============================================================================

/// Arc-owning PostgreSQL authorization service.
#[derive(Debug, Clone)]
pub struct ArcAuthorizationService {
    pool: Arc<PgPool>,
}

impl ArcAuthorizationService {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationService for ArcAuthorizationService {
    async fn save(&self, authorization: &AuthorizationRecord) -> StoreResult<()> {
        AuthorizationStorage::new(&self.pool)
            .save(authorization)
            .await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<AuthorizationRecord>> {
        AuthorizationStorage::new(&self.pool).find_by_id(id).await
    }

    async fn find_by_token(
        &self,
        value: &str,
        kind: Option<TokenKind>,
    ) -> StoreResult<Option<AuthorizationRecord>> {
        AuthorizationStorage::new(&self.pool)
            .find_by_token(value, kind)
            .await
    }

    async fn remove_by_id(&self, id: &str) -> StoreResult<()> {
        AuthorizationStorage::new(&self.pool).remove_by_id(id).await?;
        Ok(())
    }

    async fn remove_expired(&self, now: OffsetDateTime) -> StoreResult<u64> {
        AuthorizationStorage::new(&self.pool)
            .remove_expired(now)
            .await
    }
}

// =============================================================================
// Arc-Owning Consent Service
// =============================================================================

/// Arc-owning PostgreSQL consent service.
#[derive(Debug, Clone)]
pub struct ArcConsentService {
    pool: Arc<PgPool>,
}

impl ArcConsentService {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationConsentService for ArcConsentService {
    async fn save(&self, consent: &ConsentRecord) -> StoreResult<()> {
        ConsentStorage::new(&self.pool).save(consent).await
    }

    async fn find_by_id(
        &self,
        registered_client_id: &str,
        principal_name: &str,
    ) -> StoreResult<Option<ConsentRecord>> {
        ConsentStorage::new(&self.pool)
            .find_by_id(registered_client_id, principal_name)
            .await
    }

    async fn find_by_principal(&self, principal_name: &str) -> StoreResult<Vec<ConsentRecord>> {
        ConsentStorage::new(&self.pool)
            .find_by_principal(principal_name)
            .await
    }

    async fn remove_by_id(&self, registered_client_id: &str, principal_name: &str) -> StoreResult<()> {
        ConsentStorage::new(&self.pool)
            .remove_by_id(registered_client_id, principal_name)
            .await?;
        Ok(())
    }
}
