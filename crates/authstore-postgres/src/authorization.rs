//! Authorization record storage.
//!
//! A record is split over two tables: the grant itself in
//! `oauth2_authorization` and one row per present token in
//! `oauth2_authorization_token`. Token rows are keyed by
//! `(authorization_id, token_kind)` and carry a unique
//! `(token_kind, token_digest)` key, so a value can be held by at most one
//! record per kind.
//!
//! Saves rewrite both tables in one transaction; reads fetch a record and its
//! tokens in one statement. Token values never appear in log output.

use std::collections::BTreeSet;

use sqlx_core::query::query;
use sqlx_core::row::Row;
use sqlx_postgres::PgRow;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use authstore_core::codec::{decode_map, decode_set, encode_map, encode_set};
use authstore_core::types::{AccessToken, AuthorizationRecord, IdToken, Token, TokenKind};
use authstore_core::{AttributeMap, CodecError, StoreError, StoreResult};

use crate::{
    PgPool, decode_opt_instant, encode_opt_instant, instant_nanos, map_db_error, token_digest,
};

const SELECT_JOINED: &str = r#"
    SELECT a.id, a.registered_client_id, a.principal_name, a.authorization_grant_type,
           a.authorized_scopes, a.attributes,
           t.token_kind, t.token_value, t.issued_at, t.expires_at, t.metadata,
           t.token_type, t.scopes, t.claims
    FROM oauth2_authorization a
    LEFT JOIN oauth2_authorization_token t ON t.authorization_id = a.id
"#;

/// Authorization storage operations.
pub struct AuthorizationStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthorizationStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the record with the same `id`, together with its
    /// token rows.
    ///
    /// # Errors
    ///
    /// Returns `UniquenessViolation` naming the token kind if a value is
    /// already held by another record; the transaction is rolled back and
    /// nothing is written.
    #[instrument(skip(self, authorization), fields(id = %authorization.id))]
    pub async fn save(&self, authorization: &AuthorizationRecord) -> StoreResult<()> {
        authorization
            .validate()
            .map_err(StoreError::invalid_input)?;

        // Encode everything up front so a codec failure never opens a transaction.
        let scopes = encode_set(&authorization.authorized_scopes)?;
        let attributes = encode_map(&authorization.attributes)?;
        let tokens = token_rows(authorization)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error("authorization", e))?;

        query(
            r#"
            INSERT INTO oauth2_authorization (
                id, registered_client_id, principal_name, authorization_grant_type,
                authorized_scopes, attributes
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                registered_client_id = EXCLUDED.registered_client_id,
                principal_name = EXCLUDED.principal_name,
                authorization_grant_type = EXCLUDED.authorization_grant_type,
                authorized_scopes = EXCLUDED.authorized_scopes,
                attributes = EXCLUDED.attributes,
                updated_at = NOW()
            "#,
        )
        .bind(&authorization.id)
        .bind(&authorization.registered_client_id)
        .bind(&authorization.principal_name)
        .bind(authorization.authorization_grant_type.as_str())
        .bind(scopes)
        .bind(attributes)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error("authorization", e))?;

        query("DELETE FROM oauth2_authorization_token WHERE authorization_id = $1")
            .bind(&authorization.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error("authorization", e))?;

        for row in tokens {
            query(
                r#"
                INSERT INTO oauth2_authorization_token (
                    authorization_id, token_kind, token_value, token_digest,
                    issued_at, expires_at, expires_at_nanos, metadata, token_type, scopes, claims
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(&authorization.id)
            .bind(row.kind.as_str())
            .bind(row.value)
            .bind(token_digest(row.value))
            .bind(row.issued_at)
            .bind(row.expires_at)
            .bind(row.expires_at_nanos)
            .bind(row.metadata)
            .bind(row.token_type)
            .bind(row.scopes)
            .bind(row.claims)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let err = map_db_error("authorization", e);
                if err.is_uniqueness_violation() {
                    warn!(
                        id = %authorization.id,
                        token_kind = %row.kind,
                        "token value already held by another authorization"
                    );
                    return StoreError::uniqueness("authorization", row.kind.as_str());
                }
                err
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| map_db_error("authorization", e))?;

        debug!(
            registered_client_id = %authorization.registered_client_id,
            "Saved authorization"
        );
        Ok(())
    }

    /// Finds a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a column cannot be decoded.
    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<AuthorizationRecord>> {
        let rows = query(&format!("{SELECT_JOINED} WHERE a.id = $1"))
            .bind(id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| map_db_error("authorization", e))?;

        rows_to_record(&rows)
    }

    /// Finds the record holding `value`.
    ///
    /// With a hint only that kind is searched. Without one the kinds of
    /// [`TokenKind::LOOKUP_ORDER`] are searched and the highest-priority
    /// match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a column cannot be decoded.
    pub async fn find_by_token(
        &self,
        value: &str,
        kind: Option<TokenKind>,
    ) -> StoreResult<Option<AuthorizationRecord>> {
        let kinds: Vec<&str> = match kind {
            Some(kind) => vec![kind.as_str()],
            None => TokenKind::LOOKUP_ORDER.iter().map(TokenKind::as_str).collect(),
        };

        let rows = query(&format!(
            r#"{SELECT_JOINED}
            WHERE a.id = (
                SELECT authorization_id
                FROM oauth2_authorization_token
                WHERE token_digest = $1
                  AND token_value = $2
                  AND token_kind = ANY($3)
                ORDER BY array_position($3, token_kind)
                LIMIT 1
            )"#
        ))
        .bind(token_digest(value))
        .bind(value)
        .bind(&kinds)
        .fetch_all(self.pool)
        .await
        .map_err(|e| map_db_error("authorization", e))?;

        rows_to_record(&rows)
    }

    /// Deletes a record and its tokens. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn remove_by_id(&self, id: &str) -> StoreResult<bool> {
        let result = query("DELETE FROM oauth2_authorization WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_db_error("authorization", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes records with no pending state whose tokens have all expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn remove_expired(&self, now: OffsetDateTime) -> StoreResult<u64> {
        let result = query(
            r#"
            DELETE FROM oauth2_authorization a
            WHERE EXISTS (
                SELECT 1 FROM oauth2_authorization_token t
                WHERE t.authorization_id = a.id AND t.token_kind <> 'state'
            )
            AND NOT EXISTS (
                SELECT 1 FROM oauth2_authorization_token t
                WHERE t.authorization_id = a.id
                  AND (
                      t.token_kind = 'state'
                      OR t.expires_at_nanos IS NULL
                      OR t.expires_at_nanos > $1
                  )
            )
            "#,
        )
        .bind(instant_nanos(now))
        .execute(self.pool)
        .await
        .map_err(|e| map_db_error("authorization", e))?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, "Removed expired authorizations");
        }
        Ok(removed)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

/// One `oauth2_authorization_token` row ready for binding.
struct TokenRow<'r> {
    kind: TokenKind,
    value: &'r str,
    issued_at: Option<String>,
    expires_at: Option<String>,
    expires_at_nanos: Option<i64>,
    metadata: String,
    token_type: Option<&'r str>,
    scopes: Option<String>,
    claims: Option<String>,
}

fn token_rows(record: &AuthorizationRecord) -> StoreResult<Vec<TokenRow<'_>>> {
    let mut rows = Vec::new();

    if let Some(state) = &record.state {
        rows.push(TokenRow {
            kind: TokenKind::State,
            value: state,
            issued_at: None,
            expires_at: None,
            expires_at_nanos: None,
            metadata: encode_map(&AttributeMap::new())?,
            token_type: None,
            scopes: None,
            claims: None,
        });
    }

    for kind in TokenKind::ALL {
        let Some(token) = record.token(kind) else {
            continue;
        };
        let mut row = TokenRow {
            kind,
            value: &token.value,
            issued_at: encode_opt_instant(token.issued_at)?,
            expires_at: encode_opt_instant(token.expires_at)?,
            expires_at_nanos: token.expires_at.map(instant_nanos),
            metadata: encode_map(&token.metadata)?,
            token_type: None,
            scopes: None,
            claims: None,
        };
        match kind {
            TokenKind::AccessToken => {
                if let Some(access) = &record.access_token {
                    row.token_type = Some(&access.token_type);
                    row.scopes = Some(encode_set(&access.scopes)?);
                }
            }
            TokenKind::IdToken => {
                if let Some(id_token) = &record.oidc_id_token {
                    row.claims = Some(encode_map(&id_token.claims)?);
                }
            }
            _ => {}
        }
        rows.push(row);
    }

    Ok(rows)
}

fn rows_to_record(rows: &[PgRow]) -> StoreResult<Option<AuthorizationRecord>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let mut record = AuthorizationRecord::new(
        get::<String>(first, "id")?,
        get::<String>(first, "registered_client_id")?,
        get::<String>(first, "principal_name")?,
        get::<String>(first, "authorization_grant_type")?.into(),
    );
    record.authorized_scopes = decode_set(&get::<String>(first, "authorized_scopes")?)?;
    record.attributes = decode_map(&get::<String>(first, "attributes")?)?;

    for row in rows {
        let Some(kind) = get::<Option<String>>(row, "token_kind")? else {
            continue;
        };
        let kind = kind
            .parse::<TokenKind>()
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        apply_token_row(&mut record, kind, row)?;
    }

    Ok(Some(record))
}

fn apply_token_row(record: &mut AuthorizationRecord, kind: TokenKind, row: &PgRow) -> StoreResult<()> {
    let value = get::<String>(row, "token_value")?;
    if kind == TokenKind::State {
        record.state = Some(value);
        return Ok(());
    }

    let token = Token {
        value,
        issued_at: decode_opt_instant(get(row, "issued_at")?)?,
        expires_at: decode_opt_instant(get(row, "expires_at")?)?,
        metadata: decode_map(&get::<String>(row, "metadata")?)?,
    };

    match kind {
        TokenKind::State => {}
        TokenKind::AuthorizationCode => record.authorization_code = Some(token),
        TokenKind::AccessToken => {
            let scopes: BTreeSet<String> = get::<Option<String>>(row, "scopes")?
                .map(|raw| decode_set(&raw))
                .transpose()?
                .unwrap_or_default();
            let token_type = get::<Option<String>>(row, "token_type")?
                .unwrap_or_else(|| "Bearer".to_string());
            record.access_token = Some(AccessToken {
                token,
                token_type,
                scopes,
            });
        }
        TokenKind::RefreshToken => record.refresh_token = Some(token),
        TokenKind::IdToken => {
            let claims = get::<Option<String>>(row, "claims")?
                .map(|raw| decode_map(&raw))
                .transpose()?
                .unwrap_or_default();
            record.oidc_id_token = Some(IdToken { token, claims });
        }
        TokenKind::UserCode => record.user_code = Some(token),
        TokenKind::DeviceCode => record.device_code = Some(token),
    }
    Ok(())
}

fn get<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: for<'r> sqlx_core::decode::Decode<'r, sqlx_postgres::Postgres>
        + sqlx_core::types::Type<sqlx_postgres::Postgres>,
{
    row.try_get::<T, _>(column)
        .map_err(|e| map_db_error("authorization", e))
}
