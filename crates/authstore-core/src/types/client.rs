//! OAuth 2.0 client registration types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::settings::{ClientSettings, TokenSettings};

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 authorization grant types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthorizationGrantType {
    AuthorizationCode,
    ClientCredentials,
    RefreshToken,
    /// RFC 8628 device authorization grant.
    DeviceCode,
    /// RFC 7523 JWT bearer grant.
    JwtBearer,
    /// RFC 8693 token exchange.
    TokenExchange,
    /// Any extension grant, stored by its `grant_type` value.
    Custom(String),
}

impl AuthorizationGrantType {
    /// Returns the `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
            Self::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
            Self::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
            Self::Custom(value) => value,
        }
    }
}

impl From<String> for AuthorizationGrantType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "authorization_code" => Self::AuthorizationCode,
            "client_credentials" => Self::ClientCredentials,
            "refresh_token" => Self::RefreshToken,
            "urn:ietf:params:oauth:grant-type:device_code" => Self::DeviceCode,
            "urn:ietf:params:oauth:grant-type:jwt-bearer" => Self::JwtBearer,
            "urn:ietf:params:oauth:grant-type:token-exchange" => Self::TokenExchange,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for AuthorizationGrantType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<AuthorizationGrantType> for String {
    fn from(value: AuthorizationGrantType) -> Self {
        match value {
            AuthorizationGrantType::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AuthorizationGrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Client Authentication Method
// =============================================================================

/// Token-endpoint client authentication methods.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientAuthenticationMethod {
    ClientSecretBasic,
    ClientSecretPost,
    ClientSecretJwt,
    PrivateKeyJwt,
    TlsClientAuth,
    SelfSignedTlsClientAuth,
    None,
    Custom(String),
}

impl ClientAuthenticationMethod {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
            Self::ClientSecretJwt => "client_secret_jwt",
            Self::PrivateKeyJwt => "private_key_jwt",
            Self::TlsClientAuth => "tls_client_auth",
            Self::SelfSignedTlsClientAuth => "self_signed_tls_client_auth",
            Self::None => "none",
            Self::Custom(value) => value,
        }
    }
}

impl From<String> for ClientAuthenticationMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "client_secret_basic" => Self::ClientSecretBasic,
            "client_secret_post" => Self::ClientSecretPost,
            "client_secret_jwt" => Self::ClientSecretJwt,
            "private_key_jwt" => Self::PrivateKeyJwt,
            "tls_client_auth" => Self::TlsClientAuth,
            "self_signed_tls_client_auth" => Self::SelfSignedTlsClientAuth,
            "none" => Self::None,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for ClientAuthenticationMethod {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ClientAuthenticationMethod> for String {
    fn from(value: ClientAuthenticationMethod) -> Self {
        match value {
            ClientAuthenticationMethod::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ClientAuthenticationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Client Registration
// =============================================================================

/// A registered OAuth 2.0 client.
///
/// `id` is the internal key; `client_id` is the public identifier used in
/// protocol requests and is unique across the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistration {
    pub id: String,

    pub client_id: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub client_id_issued_at: Option<OffsetDateTime>,

    /// Secret as handed over by the caller (usually already hashed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub client_secret_expires_at: Option<OffsetDateTime>,

    #[serde(default)]
    pub client_name: String,

    #[serde(default)]
    pub client_authentication_methods: BTreeSet<ClientAuthenticationMethod>,

    #[serde(default)]
    pub authorization_grant_types: BTreeSet<AuthorizationGrantType>,

    #[serde(default)]
    pub redirect_uris: BTreeSet<String>,

    #[serde(default)]
    pub post_logout_redirect_uris: BTreeSet<String>,

    #[serde(default)]
    pub scopes: BTreeSet<String>,

    #[serde(default)]
    pub client_settings: ClientSettings,

    #[serde(default)]
    pub token_settings: TokenSettings,
}

impl ClientRegistration {
    /// Creates a registration with empty sets and default settings.
    #[must_use]
    pub fn new(id: impl Into<String>, client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        Self {
            id: id.into(),
            client_name: client_id.clone(),
            client_id,
            client_id_issued_at: None,
            client_secret: None,
            client_secret_expires_at: None,
            client_authentication_methods: BTreeSet::new(),
            authorization_grant_types: BTreeSet::new(),
            redirect_uris: BTreeSet::new(),
            post_logout_redirect_uris: BTreeSet::new(),
            scopes: BTreeSet::new(),
            client_settings: ClientSettings::default(),
            token_settings: TokenSettings::default(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    #[must_use]
    pub fn with_grant_type(mut self, grant_type: AuthorizationGrantType) -> Self {
        self.authorization_grant_types.insert(grant_type);
        self
    }

    #[must_use]
    pub fn with_authentication_method(mut self, method: ClientAuthenticationMethod) -> Self {
        self.client_authentication_methods.insert(method);
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.insert(uri.into());
        self
    }

    /// Checks the fields the store relies on for keying.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first empty key field.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("client registration id cannot be empty".into());
        }
        if self.client_id.is_empty() {
            return Err("client_id cannot be empty".into());
        }
        Ok(())
    }

    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: &AuthorizationGrantType) -> bool {
        self.authorization_grant_types.contains(grant_type)
    }

    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.contains(uri)
    }

    /// Whether the secret has an expiry that lies before `now`.
    #[must_use]
    pub fn is_secret_expired(&self, now: OffsetDateTime) -> bool {
        self.client_secret_expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_grant_type_string_mapping() {
        assert_eq!(
            AuthorizationGrantType::from("urn:ietf:params:oauth:grant-type:device_code"),
            AuthorizationGrantType::DeviceCode
        );
        assert_eq!(
            AuthorizationGrantType::from("urn:example:custom"),
            AuthorizationGrantType::Custom("urn:example:custom".into())
        );
        assert_eq!(AuthorizationGrantType::RefreshToken.to_string(), "refresh_token");
    }

    #[test]
    fn test_grant_type_serde() {
        let json = serde_json::to_string(&AuthorizationGrantType::ClientCredentials).unwrap();
        assert_eq!(json, "\"client_credentials\"");
        let parsed: ClientAuthenticationMethod = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, ClientAuthenticationMethod::None);
    }

    #[test]
    fn test_validate() {
        assert!(ClientRegistration::new("c1", "demo-client").validate().is_ok());
        assert!(ClientRegistration::new("", "demo-client").validate().is_err());
        assert!(ClientRegistration::new("c1", "").validate().is_err());
    }

    #[test]
    fn test_secret_expiry() {
        let mut client = ClientRegistration::new("c1", "demo-client");
        let now = datetime!(2024-05-01 12:00 UTC);
        assert!(!client.is_secret_expired(now));
        client.client_secret_expires_at = Some(datetime!(2024-05-01 11:00 UTC));
        assert!(client.is_secret_expired(now));
    }

    #[test]
    fn test_json_round_trip() {
        let client = ClientRegistration::new("c1", "demo-client")
            .with_scope("read")
            .with_grant_type(AuthorizationGrantType::AuthorizationCode)
            .with_authentication_method(ClientAuthenticationMethod::ClientSecretBasic)
            .with_redirect_uri("https://app.example.com/cb");
        let json = serde_json::to_string(&client).unwrap();
        let parsed: ClientRegistration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, client);
    }
}
