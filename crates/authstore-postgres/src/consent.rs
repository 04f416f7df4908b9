//! Consent storage.
//!
//! One row per `(registered_client_id, principal_name)`; authorities are a
//! codec-encoded set. Saving replaces the whole authority set.

use sqlx_core::query::query;
use sqlx_core::row::Row;
use sqlx_postgres::PgRow;
use tracing::{debug, instrument};

use authstore_core::codec::{decode_set, encode_set};
use authstore_core::types::ConsentRecord;
use authstore_core::{StoreError, StoreResult};

use crate::{PgPool, map_db_error};

/// Consent storage operations.
pub struct ConsentStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> ConsentStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the consent for the record's key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty key, or an error if the query fails.
    #[instrument(skip(self, consent), fields(registered_client_id = %consent.registered_client_id))]
    pub async fn save(&self, consent: &ConsentRecord) -> StoreResult<()> {
        consent.validate().map_err(StoreError::invalid_input)?;

        query(
            r#"
            INSERT INTO oauth2_authorization_consent (registered_client_id, principal_name, authorities)
            VALUES ($1, $2, $3)
            ON CONFLICT (registered_client_id, principal_name) DO UPDATE SET
                authorities = EXCLUDED.authorities,
                updated_at = NOW()
            "#,
        )
        .bind(&consent.registered_client_id)
        .bind(&consent.principal_name)
        .bind(encode_set(&consent.authorities)?)
        .execute(self.pool)
        .await
        .map_err(|e| map_db_error("consent", e))?;

        debug!(authorities = consent.authorities.len(), "Saved consent");
        Ok(())
    }

    /// Finds the consent for a client and principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the authorities cannot be decoded.
    pub async fn find_by_id(
        &self,
        registered_client_id: &str,
        principal_name: &str,
    ) -> StoreResult<Option<ConsentRecord>> {
        let row = query(
            r#"
            SELECT registered_client_id, principal_name, authorities
            FROM oauth2_authorization_consent
            WHERE registered_client_id = $1 AND principal_name = $2
            "#,
        )
        .bind(registered_client_id)
        .bind(principal_name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_db_error("consent", e))?;

        row.as_ref().map(row_to_consent).transpose()
    }

    /// All consents given by a principal, ordered by client id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn find_by_principal(&self, principal_name: &str) -> StoreResult<Vec<ConsentRecord>> {
        let rows = query(
            r#"
            SELECT registered_client_id, principal_name, authorities
            FROM oauth2_authorization_consent
            WHERE principal_name = $1
            ORDER BY registered_client_id
            "#,
        )
        .bind(principal_name)
        .fetch_all(self.pool)
        .await
        .map_err(|e| map_db_error("consent", e))?;

        rows.iter().map(row_to_consent).collect()
    }

    /// Deletes a consent. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn remove_by_id(
        &self,
        registered_client_id: &str,
        principal_name: &str,
    ) -> StoreResult<bool> {
        let result = query(
            "DELETE FROM oauth2_authorization_consent WHERE registered_client_id = $1 AND principal_name = $2",
        )
        .bind(registered_client_id)
        .bind(principal_name)
        .execute(self.pool)
        .await
        .map_err(|e| map_db_error("consent", e))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_consent(row: &PgRow) -> StoreResult<ConsentRecord> {
    let text = |column: &str| {
        row.try_get::<String, _>(column)
            .map_err(|e| map_db_error("consent", e))
    };

    Ok(ConsentRecord {
        registered_client_id: text("registered_client_id")?,
        principal_name: text("principal_name")?,
        authorities: decode_set(&text("authorities")?)?,
    })
}
