//! Database migration management.
//!
//! Migrations are embedded in the binary, so no filesystem access is needed
//! at runtime.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use authstore_core::{StoreError, StoreResult};

/// Embedded migrations in chronological order: (version, description, sql).
///
/// To add a migration, create the SQL file under `migrations/` and append an
/// entry here.
macro_rules! embedded_migrations {
    () => {
        &[(
            20240501000001i64,
            "authorization_store",
            include_str!("../../migrations/20240501000001_authorization_store.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Number of embedded migrations.
#[must_use]
pub fn count() -> usize {
    build_migrations().len()
}

/// Applies all pending migrations. Applied versions are tracked in
/// `_sqlx_migrations`.
///
/// # Errors
///
/// Returns `Backend` if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> StoreResult<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running database migrations (embedded)");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| StoreError::backend(format!("Migration failed: {e}")))?;

    info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_non_empty() {
        let migrations = build_migrations();
        assert!(!migrations.is_empty());
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
        assert!(migrations.iter().all(|m| !m.sql.trim().is_empty()));
    }

    #[test]
    fn test_schema_has_unique_keys() {
        let sql = &build_migrations()[0].sql;
        assert!(sql.contains("oauth2_registered_client_client_id_key UNIQUE (client_id)"));
        assert!(sql.contains("UNIQUE (token_kind, token_digest)"));
        assert!(sql.contains("PRIMARY KEY (registered_client_id, principal_name)"));
        assert!(!sql.contains("VARCHAR(255)"));
    }
}
