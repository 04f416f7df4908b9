//! PostgreSQL backend for the authorization-state store.
//!
//! Provides persistent storage for:
//!
//! - Registered clients (`oauth2_registered_client`)
//! - Authorization records (`oauth2_authorization`, one row per token in
//!   `oauth2_authorization_token`)
//! - Consents (`oauth2_authorization_consent`)
//!
//! Uniqueness of client identifiers and token values is enforced by database
//! constraints, so concurrent writers from several processes see the same
//! guarantees as a single one.
//!
//! # Example
//!
//! ```ignore
//! use authstore_postgres::{PostgresAuthStore, PostgresConfig};
//!
//! let store = PostgresAuthStore::connect(&PostgresConfig::new("postgres://localhost/auth")).await?;
//! let client = store.clients().find_by_client_id("my-app").await?;
//! ```

pub mod authorization;
pub mod client;
pub mod config;
pub mod consent;
pub mod migrations;
pub mod pool;
pub mod storage_adapters;

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::info;

use time::OffsetDateTime;

use authstore_core::codec::{decode_instant, encode_instant};
use authstore_core::{
    AuthorizationConsentService, AuthorizationService, CodecError, RegisteredClientRepository,
    StoreError, StoreResult,
};

pub use authorization::AuthorizationStorage;
pub use client::ClientStorage;
pub use config::PostgresConfig;
pub use consent::ConsentStorage;
pub use pool::create_pool;
pub use storage_adapters::{ArcAuthorizationService, ArcClientRepository, ArcConsentService};

/// PostgreSQL connection pool type alias.
pub type PgPool = sqlx_postgres::PgPool;

// =============================================================================
// Store
// =============================================================================

/// Entry point bundling the pool and the three stores.
#[derive(Debug, Clone)]
pub struct PostgresAuthStore {
    pool: Arc<PgPool>,
}

impl PostgresAuthStore {
    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Creates a pool from `config` and applies the embedded migrations when
    /// `config.run_migrations` is set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a bad configuration, `StorageUnavailable` if
    /// the database cannot be reached, or `Backend` if a migration fails.
    pub async fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        config.validate().map_err(StoreError::invalid_input)?;
        let pool = create_pool(config).await?;
        if config.run_migrations {
            migrations::run(&pool).await?;
        }
        info!("PostgreSQL authorization store ready");
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn pool_arc(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    #[must_use]
    pub fn clients(&self) -> ClientStorage<'_> {
        ClientStorage::new(&self.pool)
    }

    #[must_use]
    pub fn authorizations(&self) -> AuthorizationStorage<'_> {
        AuthorizationStorage::new(&self.pool)
    }

    #[must_use]
    pub fn consents(&self) -> ConsentStorage<'_> {
        ConsentStorage::new(&self.pool)
    }

    /// Client registry as a trait object.
    #[must_use]
    pub fn client_repository(&self) -> Arc<dyn RegisteredClientRepository> {
        Arc::new(ArcClientRepository::new(self.pool_arc()))
    }

    /// Authorization service as a trait object.
    #[must_use]
    pub fn authorization_service(&self) -> Arc<dyn AuthorizationService> {
        Arc::new(ArcAuthorizationService::new(self.pool_arc()))
    }

    /// Consent service as a trait object.
    #[must_use]
    pub fn consent_service(&self) -> Arc<dyn AuthorizationConsentService> {
        Arc::new(ArcConsentService::new(self.pool_arc()))
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Maps a driver error to the store taxonomy.
///
/// Unique violations become `UniquenessViolation` with the field taken from
/// the constraint name. Connection-level failures, deadlocks and
/// serialization failures become `StorageUnavailable`.
pub(crate) fn map_db_error(entity: &str, err: sqlx_core::Error) -> StoreError {
    match err {
        sqlx_core::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            StoreError::uniqueness(entity, unique_field(db_err.constraint()))
        }
        sqlx_core::Error::Database(ref db_err) if is_transient_code(db_err.code().as_deref()) => {
            StoreError::unavailable(err.to_string())
        }
        sqlx_core::Error::PoolTimedOut
        | sqlx_core::Error::PoolClosed
        | sqlx_core::Error::WorkerCrashed
        | sqlx_core::Error::Io(_)
        | sqlx_core::Error::Tls(_) => StoreError::unavailable(err.to_string()),
        sqlx_core::Error::ColumnDecode { .. } | sqlx_core::Error::Decode(_) => {
            StoreError::Codec(CodecError::Decode(err.to_string()))
        }
        other => StoreError::backend(other.to_string()),
    }
}

/// SQLSTATE codes for conflicts that succeed when the statement is retried.
fn is_transient_code(code: Option<&str>) -> bool {
    // serialization_failure, deadlock_detected
    matches!(code, Some("40001" | "40P01"))
}

fn unique_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("oauth2_registered_client_client_id_key") => "client_id",
        Some("oauth2_authorization_token_value_key") => "token_value",
        _ => "id",
    }
}

/// Hex SHA-256 of a token value, used as its index key.
pub(crate) fn token_digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

// =============================================================================
// Instant Columns
// =============================================================================

pub(crate) fn encode_opt_instant(at: Option<OffsetDateTime>) -> StoreResult<Option<String>> {
    Ok(at.map(encode_instant).transpose()?)
}

pub(crate) fn decode_opt_instant(raw: Option<String>) -> StoreResult<Option<OffsetDateTime>> {
    Ok(raw.as_deref().map(decode_instant).transpose()?)
}

/// Unix nanoseconds of `at`, saturated to the `BIGINT` range (years 1677 to
/// 2262). Used only for ordering against a reference instant.
pub(crate) fn instant_nanos(at: OffsetDateTime) -> i64 {
    let nanos = at.unix_timestamp_nanos();
    i64::try_from(nanos).unwrap_or(if nanos < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_digest_is_stable_hex() {
        let digest = token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(token_digest(&"x".repeat(8192)).len(), 64);
    }

    #[test]
    fn test_pool_errors_are_retryable() {
        assert!(map_db_error("client", sqlx_core::Error::PoolTimedOut).is_retryable());
        assert!(!map_db_error("client", sqlx_core::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_deadlock_and_serialization_failure_are_transient() {
        assert!(is_transient_code(Some("40001")));
        assert!(is_transient_code(Some("40P01")));
        assert!(!is_transient_code(Some("23505")));
        assert!(!is_transient_code(None));
    }

    #[test]
    fn test_instant_nanos_keeps_order_and_saturates() {
        use time::macros::datetime;

        let a = datetime!(2024-05-01 10:00:00.000000001 UTC);
        let b = datetime!(2024-05-01 10:00:00.000000002 +00:00);
        assert!(instant_nanos(a) < instant_nanos(b));
        assert_eq!(
            instant_nanos(datetime!(2024-05-01 12:00 +02:00)),
            instant_nanos(datetime!(2024-05-01 10:00 UTC))
        );
        assert_eq!(instant_nanos(datetime!(9999-01-01 0:00 UTC)), i64::MAX);
        assert_eq!(instant_nanos(datetime!(1000-01-01 0:00 UTC)), i64::MIN);
    }

    #[test]
    fn test_unique_field_from_constraint() {
        assert_eq!(
            unique_field(Some("oauth2_registered_client_client_id_key")),
            "client_id"
        );
        assert_eq!(unique_field(None), "id");
    }
}
