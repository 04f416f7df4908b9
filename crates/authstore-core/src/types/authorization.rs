//! Authorization record types.
//!
//! An [`AuthorizationRecord`] holds the state of one authorization grant from
//! the authorization request through code, token and refresh issuance. Each
//! token kind has exactly one optional slot, so a record can never carry two
//! values of the same kind.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::client::AuthorizationGrantType;
use crate::codec::{AttributeMap, AttributeValue};

/// Metadata key marking a token as no longer usable.
pub const INVALIDATED_METADATA_KEY: &str = "metadata.token.invalidated";

// =============================================================================
// Token Kind
// =============================================================================

/// Kinds of values an authorization record can be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    State,
    #[serde(rename = "code")]
    AuthorizationCode,
    AccessToken,
    RefreshToken,
    IdToken,
    UserCode,
    DeviceCode,
}

impl TokenKind {
    /// Every kind, in declaration order.
    pub const ALL: [TokenKind; 7] = [
        Self::State,
        Self::AuthorizationCode,
        Self::AccessToken,
        Self::RefreshToken,
        Self::IdToken,
        Self::UserCode,
        Self::DeviceCode,
    ];

    /// Kinds searched by an unhinted token lookup, highest priority first.
    ///
    /// Id tokens are only found with an explicit hint.
    pub const LOOKUP_ORDER: [TokenKind; 6] = [
        Self::State,
        Self::AuthorizationCode,
        Self::AccessToken,
        Self::RefreshToken,
        Self::UserCode,
        Self::DeviceCode,
    ];

    /// Returns the token type identifier (`token_type_hint` value).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::AuthorizationCode => "code",
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::IdToken => "id_token",
            Self::UserCode => "user_code",
            Self::DeviceCode => "device_code",
        }
    }

    /// Position in [`Self::LOOKUP_ORDER`], if the kind takes part in
    /// unhinted lookups.
    #[must_use]
    pub fn lookup_priority(&self) -> Option<usize> {
        Self::LOOKUP_ORDER.iter().position(|k| k == self)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown token kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown token kind: {0}")]
pub struct UnknownTokenKind(pub String);

impl FromStr for TokenKind {
    type Err = UnknownTokenKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownTokenKind(s.to_string()))
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// An issued token value with its lifetime and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub value: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub issued_at: Option<OffsetDateTime>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,

    #[serde(default)]
    pub metadata: AttributeMap,
}

impl Token {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            issued_at: None,
            expires_at: None,
            metadata: AttributeMap::new(),
        }
    }

    /// Creates a token valid from `issued_at` until `expires_at`.
    #[must_use]
    pub fn issued(
        value: impl Into<String>,
        issued_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            issued_at: Some(issued_at),
            expires_at: Some(expires_at),
            ..Self::new(value)
        }
    }

    /// A token without an expiry never expires.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.metadata
            .get(INVALIDATED_METADATA_KEY)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(false)
    }

    /// Usable: neither invalidated nor expired, and already issued.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        !self.is_invalidated()
            && !self.is_expired(now)
            && self.issued_at.is_none_or(|at| at <= now)
    }

    pub fn invalidate(&mut self) {
        self.metadata
            .insert(INVALIDATED_METADATA_KEY.to_string(), AttributeValue::Boolean(true));
    }
}

/// Access token with its type and granted scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    #[serde(flatten)]
    pub token: Token,

    /// Usually `Bearer` or `DPoP`.
    pub token_type: String,

    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

impl AccessToken {
    /// Creates a bearer access token.
    #[must_use]
    pub fn bearer(token: Token, scopes: BTreeSet<String>) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            scopes,
        }
    }
}

/// OIDC id token with its claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdToken {
    #[serde(flatten)]
    pub token: Token,

    #[serde(default)]
    pub claims: AttributeMap,
}

// =============================================================================
// Authorization Record
// =============================================================================

/// Persisted state of one OAuth 2.0 authorization grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRecord {
    pub id: String,

    pub registered_client_id: String,

    pub principal_name: String,

    pub authorization_grant_type: AuthorizationGrantType,

    #[serde(default)]
    pub authorized_scopes: BTreeSet<String>,

    #[serde(default)]
    pub attributes: AttributeMap,

    /// Single-use value binding the authorization request to its response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<Token>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Token>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_id_token: Option<IdToken>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_code: Option<Token>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_code: Option<Token>,
}

impl AuthorizationRecord {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        registered_client_id: impl Into<String>,
        principal_name: impl Into<String>,
        authorization_grant_type: AuthorizationGrantType,
    ) -> Self {
        Self {
            id: id.into(),
            registered_client_id: registered_client_id.into(),
            principal_name: principal_name.into(),
            authorization_grant_type,
            authorized_scopes: BTreeSet::new(),
            attributes: AttributeMap::new(),
            state: None,
            authorization_code: None,
            access_token: None,
            refresh_token: None,
            oidc_id_token: None,
            user_code: None,
            device_code: None,
        }
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    #[must_use]
    pub fn with_authorized_scope(mut self, scope: impl Into<String>) -> Self {
        self.authorized_scopes.insert(scope.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_authorization_code(mut self, token: Token) -> Self {
        self.authorization_code = Some(token);
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: Token) -> Self {
        self.refresh_token = Some(token);
        self
    }

    #[must_use]
    pub fn with_id_token(mut self, token: IdToken) -> Self {
        self.oidc_id_token = Some(token);
        self
    }

    #[must_use]
    pub fn with_user_code(mut self, token: Token) -> Self {
        self.user_code = Some(token);
        self
    }

    #[must_use]
    pub fn with_device_code(mut self, token: Token) -> Self {
        self.device_code = Some(token);
        self
    }

    // -------------------------------------------------------------------------
    // Token Access
    // -------------------------------------------------------------------------

    /// Returns the token stored for `kind`. The state has no [`Token`].
    #[must_use]
    pub fn token(&self, kind: TokenKind) -> Option<&Token> {
        match kind {
            TokenKind::State => None,
            TokenKind::AuthorizationCode => self.authorization_code.as_ref(),
            TokenKind::AccessToken => self.access_token.as_ref().map(|t| &t.token),
            TokenKind::RefreshToken => self.refresh_token.as_ref(),
            TokenKind::IdToken => self.oidc_id_token.as_ref().map(|t| &t.token),
            TokenKind::UserCode => self.user_code.as_ref(),
            TokenKind::DeviceCode => self.device_code.as_ref(),
        }
    }

    pub fn token_mut(&mut self, kind: TokenKind) -> Option<&mut Token> {
        match kind {
            TokenKind::State => None,
            TokenKind::AuthorizationCode => self.authorization_code.as_mut(),
            TokenKind::AccessToken => self.access_token.as_mut().map(|t| &mut t.token),
            TokenKind::RefreshToken => self.refresh_token.as_mut(),
            TokenKind::IdToken => self.oidc_id_token.as_mut().map(|t| &mut t.token),
            TokenKind::UserCode => self.user_code.as_mut(),
            TokenKind::DeviceCode => self.device_code.as_mut(),
        }
    }

    /// Returns the lookup value stored for `kind`.
    #[must_use]
    pub fn token_value(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::State => self.state.as_deref(),
            other => self.token(other).map(|t| t.value.as_str()),
        }
    }

    /// All present lookup values, in [`TokenKind::ALL`] order.
    #[must_use]
    pub fn token_values(&self) -> Vec<(TokenKind, &str)> {
        TokenKind::ALL
            .into_iter()
            .filter_map(|kind| self.token_value(kind).map(|v| (kind, v)))
            .collect()
    }

    /// Marks the token of `kind` invalidated.
    ///
    /// Invalidating the refresh token also invalidates the access token and
    /// authorization code derived from the same grant.
    pub fn invalidate(&mut self, kind: TokenKind) {
        if let Some(token) = self.token_mut(kind) {
            token.invalidate();
        }
        if kind == TokenKind::RefreshToken {
            for dependent in [TokenKind::AccessToken, TokenKind::AuthorizationCode] {
                if let Some(token) = self.token_mut(dependent) {
                    token.invalidate();
                }
            }
        }
    }

    /// A record is expired once it holds at least one token, every token has
    /// passed its expiry, and no state is pending.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        if self.state.is_some() {
            return false;
        }
        let mut tokens = TokenKind::ALL
            .into_iter()
            .filter_map(|kind| self.token(kind))
            .peekable();
        tokens.peek().is_some() && tokens.all(|t| t.is_expired(now))
    }

    /// Checks key fields and token values.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("authorization id cannot be empty".into());
        }
        if self.registered_client_id.is_empty() {
            return Err("registered_client_id cannot be empty".into());
        }
        if self.principal_name.is_empty() {
            return Err("principal_name cannot be empty".into());
        }
        if let Some((kind, _)) = self.token_values().into_iter().find(|(_, v)| v.is_empty()) {
            return Err(format!("{kind} value cannot be empty"));
        }
        Ok(())
    }
}
