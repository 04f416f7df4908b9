//! Authorization consent types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Prefix under which scopes are stored as authorities.
pub const SCOPE_AUTHORITY_PREFIX: &str = "SCOPE_";

/// A principal's recorded approval for one client.
///
/// Keyed by `(registered_client_id, principal_name)`. Authorities are free
/// strings; scopes are authorities with the `SCOPE_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    pub registered_client_id: String,
    pub principal_name: String,
    #[serde(default)]
    pub authorities: BTreeSet<String>,
}

impl ConsentRecord {
    #[must_use]
    pub fn new(registered_client_id: impl Into<String>, principal_name: impl Into<String>) -> Self {
        Self {
            registered_client_id: registered_client_id.into(),
            principal_name: principal_name.into(),
            authorities: BTreeSet::new(),
        }
    }

    /// Creates a consent granting the given scopes.
    #[must_use]
    pub fn with_scopes<I, S>(
        registered_client_id: impl Into<String>,
        principal_name: impl Into<String>,
        scopes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut consent = Self::new(registered_client_id, principal_name);
        for scope in scopes {
            consent.add_scope(scope.as_ref());
        }
        consent
    }

    pub fn add_scope(&mut self, scope: &str) {
        self.authorities
            .insert(format!("{SCOPE_AUTHORITY_PREFIX}{scope}"));
    }

    pub fn add_authority(&mut self, authority: impl Into<String>) {
        self.authorities.insert(authority.into());
    }

    /// Granted scopes, without the authority prefix.
    #[must_use]
    pub fn scopes(&self) -> BTreeSet<String> {
        self.authorities
            .iter()
            .filter_map(|a| a.strip_prefix(SCOPE_AUTHORITY_PREFIX))
            .map(str::to_string)
            .collect()
    }

    /// Whether every requested scope has been granted.
    #[must_use]
    pub fn covers<S: AsRef<str>>(&self, requested: &[S]) -> bool {
        requested.iter().all(|scope| {
            self.authorities
                .contains(&format!("{SCOPE_AUTHORITY_PREFIX}{}", scope.as_ref()))
        })
    }

    /// Checks the composite key fields.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first empty key field.
    pub fn validate(&self) -> Result<(), String> {
        if self.registered_client_id.is_empty() {
            return Err("registered_client_id cannot be empty".into());
        }
        if self.principal_name.is_empty() {
            return Err("principal_name cannot be empty".into());
        }
        Ok(())
    }
}
