use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

use authstore_core::{AuthorizationConsentService, AuthorizationService, RegisteredClientRepository};
use authstore_postgres::PostgresAuthStore;

use crate::config::{AppConfig, BackendKind};

/// The three stores of the configured backend.
pub struct Stores {
    pub clients: Arc<dyn RegisteredClientRepository>,
    pub authorizations: Arc<dyn AuthorizationService>,
    pub consents: Arc<dyn AuthorizationConsentService>,
}

/// Fails unless the configured backend outlives the process.
///
/// A memory store opened by a command starts empty and is dropped when the
/// command exits, so nothing it reads or writes is meaningful.
pub fn require_persistent(config: &AppConfig, command: &str) -> Result<()> {
    if config.backend != BackendKind::Postgres {
        bail!(
            "{command} requires backend = \"postgres\" (the memory backend is discarded when the command exits)"
        );
    }
    Ok(())
}

pub async fn open(config: &AppConfig, command: &str) -> Result<Stores> {
    require_persistent(config, command)?;
    let store = connect_postgres(config).await?;
    Ok(Stores {
        clients: store.client_repository(),
        authorizations: store.authorization_service(),
        consents: store.consent_service(),
    })
}

pub async fn connect_postgres(config: &AppConfig) -> Result<PostgresAuthStore> {
    info!(
        url = %authstore_postgres::pool::mask_password(&config.postgres.url),
        "Connecting to PostgreSQL"
    );
    PostgresAuthStore::connect(&config.postgres)
        .await
        .context("Failed to open PostgreSQL store")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_is_refused() {
        let cfg = AppConfig::default();
        let err = require_persistent(&cfg, "client import").unwrap_err();
        assert!(err.to_string().starts_with("client import requires backend = \"postgres\""));
    }

    #[test]
    fn test_postgres_backend_is_accepted() {
        let cfg = AppConfig {
            backend: BackendKind::Postgres,
            ..AppConfig::default()
        };
        assert!(require_persistent(&cfg, "migrate").is_ok());
    }

    #[tokio::test]
    async fn test_open_refuses_memory_before_connecting() {
        let err = open(&AppConfig::default(), "purge-expired")
            .await
            .err()
            .expect("memory backend must be refused");
        assert!(err.to_string().contains("memory backend"));
    }
}
