//! Registered client storage.
//!
//! Each registration is one row of `oauth2_registered_client`. Sets and
//! settings are stored through the attribute codec; the unique constraint on
//! `client_id` rejects a second registration claiming the same public
//! identifier.

use sqlx_core::query::query;
use sqlx_core::row::Row;
use sqlx_postgres::PgRow;
use tracing::{debug, instrument, warn};

use authstore_core::codec::{decode_map, decode_set, encode_map, encode_set};
use authstore_core::types::{ClientRegistration, ClientSettings, TokenSettings};
use authstore_core::{StoreError, StoreResult};

use crate::{PgPool, decode_opt_instant, encode_opt_instant, map_db_error};

const SELECT_COLUMNS: &str = r#"
    SELECT id, client_id, client_id_issued_at, client_secret, client_secret_expires_at,
           client_name, client_authentication_methods, authorization_grant_types,
           redirect_uris, post_logout_redirect_uris, scopes, client_settings, token_settings
    FROM oauth2_registered_client
"#;

/// Client storage operations.
pub struct ClientStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> ClientStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the registration with the same `id`.
    ///
    /// # Errors
    ///
    /// Returns `UniquenessViolation` if another registration already uses the
    /// same `client_id`, or `Codec` if the settings cannot be encoded.
    #[instrument(skip(self, client), fields(id = %client.id))]
    pub async fn save(&self, client: &ClientRegistration) -> StoreResult<()> {
        client.validate().map_err(StoreError::invalid_input)?;

        let client_settings = encode_map(client.client_settings.as_map())?;
        let token_settings = encode_map(client.token_settings.as_map())?;

        query(
            r#"
            INSERT INTO oauth2_registered_client (
                id, client_id, client_id_issued_at, client_secret, client_secret_expires_at,
                client_name, client_authentication_methods, authorization_grant_types,
                redirect_uris, post_logout_redirect_uris, scopes, client_settings, token_settings
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                client_id_issued_at = EXCLUDED.client_id_issued_at,
                client_secret = EXCLUDED.client_secret,
                client_secret_expires_at = EXCLUDED.client_secret_expires_at,
                client_name = EXCLUDED.client_name,
                client_authentication_methods = EXCLUDED.client_authentication_methods,
                authorization_grant_types = EXCLUDED.authorization_grant_types,
                redirect_uris = EXCLUDED.redirect_uris,
                post_logout_redirect_uris = EXCLUDED.post_logout_redirect_uris,
                scopes = EXCLUDED.scopes,
                client_settings = EXCLUDED.client_settings,
                token_settings = EXCLUDED.token_settings,
                updated_at = NOW()
            "#,
        )
        .bind(&client.id)
        .bind(&client.client_id)
        .bind(encode_opt_instant(client.client_id_issued_at)?)
        .bind(&client.client_secret)
        .bind(encode_opt_instant(client.client_secret_expires_at)?)
        .bind(&client.client_name)
        .bind(encode_set(&client.client_authentication_methods)?)
        .bind(encode_set(&client.authorization_grant_types)?)
        .bind(encode_set(&client.redirect_uris)?)
        .bind(encode_set(&client.post_logout_redirect_uris)?)
        .bind(encode_set(&client.scopes)?)
        .bind(client_settings)
        .bind(token_settings)
        .execute(self.pool)
        .await
        .map_err(|e| {
            let err = map_db_error("client", e);
            if err.is_uniqueness_violation() {
                warn!(id = %client.id, "client_id already registered");
            }
            err
        })?;

        debug!(client_id = %client.client_id, "Saved client registration");
        Ok(())
    }

    /// Finds a registration by its internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<ClientRegistration>> {
        let row = query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| map_db_error("client", e))?;

        row.as_ref().map(row_to_client).transpose()
    }

    /// Finds a registration by its public client identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn find_by_client_id(&self, client_id: &str) -> StoreResult<Option<ClientRegistration>> {
        let row = query(&format!("{SELECT_COLUMNS} WHERE client_id = $1"))
            .bind(client_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| map_db_error("client", e))?;

        row.as_ref().map(row_to_client).transpose()
    }

    /// Deletes a registration. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn remove(&self, id: &str) -> StoreResult<bool> {
        let result = query("DELETE FROM oauth2_registered_client WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_db_error("client", e))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_client(row: &PgRow) -> StoreResult<ClientRegistration> {
    let get_text = |column: &str| -> StoreResult<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| map_db_error("client", e))
    };
    let get_time = |column: &str| {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| map_db_error("client", e))
            .and_then(decode_opt_instant)
    };

    Ok(ClientRegistration {
        id: get_text("id")?,
        client_id: get_text("client_id")?,
        client_id_issued_at: get_time("client_id_issued_at")?,
        client_secret: row
            .try_get::<Option<String>, _>("client_secret")
            .map_err(|e| map_db_error("client", e))?,
        client_secret_expires_at: get_time("client_secret_expires_at")?,
        client_name: get_text("client_name")?,
        client_authentication_methods: decode_set(&get_text("client_authentication_methods")?)?,
        authorization_grant_types: decode_set(&get_text("authorization_grant_types")?)?,
        redirect_uris: decode_set(&get_text("redirect_uris")?)?,
        post_logout_redirect_uris: decode_set(&get_text("post_logout_redirect_uris")?)?,
        scopes: decode_set(&get_text("scopes")?)?,
        client_settings: ClientSettings::from_map(decode_map(&get_text("client_settings")?)?),
        token_settings: TokenSettings::from_map(decode_map(&get_text("token_settings")?)?),
    })
}
