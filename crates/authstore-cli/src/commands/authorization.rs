use anyhow::{Result, bail};

use authstore_core::TokenKind;

use crate::output::print_json;
use crate::store::Stores;

pub async fn find(stores: &Stores, token: &str, kind: Option<&str>) -> Result<()> {
    let kind = kind.map(|k| k.parse::<TokenKind>()).transpose()?;
    match stores.authorizations.find_by_token(token, kind).await? {
        Some(authorization) => print_json(&authorization),
        None => bail!("No authorization holds the given token"),
    }
}
