use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::AppConfig;
use crate::output::print_success;
use crate::store::{Stores, connect_postgres, require_persistent};

pub async fn migrate(config: &AppConfig) -> Result<()> {
    require_persistent(config, "migrate")?;
    let mut config = config.clone();
    config.postgres = config.postgres.with_run_migrations(true);
    connect_postgres(&config).await?;
    print_success(&format!(
        "Applied {} embedded migration(s)",
        authstore_postgres::migrations::count()
    ));
    Ok(())
}

pub async fn purge_expired(stores: &Stores, now: Option<&str>) -> Result<()> {
    let now = match now {
        Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
            .with_context(|| format!("Invalid RFC 3339 instant: {raw}"))?,
        None => OffsetDateTime::now_utc(),
    };
    let removed = stores.authorizations.remove_expired(now).await?;
    print_success(&format!("Removed {removed} expired authorization(s)"));
    Ok(())
}
