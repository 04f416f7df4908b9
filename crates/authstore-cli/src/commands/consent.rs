use anyhow::Result;
use colored::Colorize;

use crate::output::{print_json, print_success};
use crate::store::Stores;

pub async fn list(stores: &Stores, principal: &str) -> Result<()> {
    let consents = stores.consents.find_by_principal(principal).await?;
    print_json(&consents)
}

pub async fn revoke(stores: &Stores, registered_client_id: &str, principal: &str) -> Result<()> {
    stores
        .consents
        .remove_by_id(registered_client_id, principal)
        .await?;
    print_success(&format!(
        "Revoked consent of {} for {}",
        principal.cyan(),
        registered_client_id.cyan()
    ));
    Ok(())
}
