//! Authorization service trait.
//!
//! This module defines the storage interface for authorization records used
//! throughout the authorization code, device code and refresh token flows.
//!
//! # Implementation Notes
//!
//! Implementations must:
//!
//! - Check token uniqueness in the same lock scope or transaction as the write
//! - Support indexed lookup by every token kind
//! - Never log token values
//! - Surface attribute decode failures instead of returning a partial record

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::StoreResult;
use crate::types::{AuthorizationRecord, TokenKind};

/// Storage trait for authorization records.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Inserts or replaces the record with the same `id`.
    ///
    /// # Errors
    ///
    /// Returns `UniquenessViolation` if any token value is already held by a
    /// different record for the same kind. In that case nothing is written.
    async fn save(&self, authorization: &AuthorizationRecord) -> StoreResult<()>;

    /// Finds a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the record cannot be decoded.
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<AuthorizationRecord>>;

    /// Finds the record holding `value`.
    ///
    /// With a `kind` hint only that kind is searched; a value stored under a
    /// different kind is not found. Without a hint the kinds in
    /// [`TokenKind::LOOKUP_ORDER`] are searched and the first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the record cannot be decoded.
    async fn find_by_token(
        &self,
        value: &str,
        kind: Option<TokenKind>,
    ) -> StoreResult<Option<AuthorizationRecord>>;

    /// Deletes a record by id. Deleting an unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn remove_by_id(&self, id: &str) -> StoreResult<()>;

    /// Deletes every record for which [`AuthorizationRecord::is_expired`]
    /// holds at `now`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn remove_expired(&self, now: OffsetDateTime) -> StoreResult<u64>;

    /// Deletes the given record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn remove(&self, authorization: &AuthorizationRecord) -> StoreResult<()> {
        self.remove_by_id(&authorization.id).await
    }
}
