use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use authstore_core::ClientRegistration;

use crate::output::{print_json, print_success};
use crate::store::Stores;

fn read_body(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}")),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn parse_registration(body: &str) -> Result<ClientRegistration> {
    serde_json::from_str(body).context("Invalid client registration JSON")
}

pub async fn get(stores: &Stores, client_id: &str) -> Result<()> {
    match stores.clients.find_by_client_id(client_id).await? {
        Some(client) => print_json(&client),
        None => bail!("No client registered with client_id {client_id}"),
    }
}

pub async fn import(stores: &Stores, file: Option<&str>) -> Result<()> {
    let client = parse_registration(&read_body(file)?)?;
    stores.clients.save(&client).await?;
    print_success(&format!(
        "Saved client {} ({})",
        client.client_id.cyan(),
        client.id
    ));
    Ok(())
}

pub async fn remove(stores: &Stores, id: &str) -> Result<()> {
    stores.clients.remove(id).await?;
    print_success(&format!("Removed client {}", id.cyan()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_registration_with_defaults() {
        let client = parse_registration(
            r#"{
                "id": "c1",
                "clientId": "demo-client",
                "scopes": ["openid", "read"],
                "authorizationGrantTypes": ["authorization_code"],
                "clientSettings": {
                    "settings.client.require-proof-key": {"type": "boolean", "value": false}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(client.client_id, "demo-client");
        assert_eq!(client.scopes.len(), 2);
        assert!(!client.client_settings.require_proof_key());
        assert!(client.redirect_uris.is_empty());
    }

    #[test]
    fn test_parse_registration_rejects_garbage() {
        assert!(parse_registration("{\"id\": 1}").is_err());
    }
}
