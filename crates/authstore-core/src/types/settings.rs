//! Client and token settings.
//!
//! Both are open key/value maps. Well-known keys get typed accessors; any
//! other key is carried through storage untouched.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::{AttributeMap, AttributeValue};

// =============================================================================
// Keys
// =============================================================================

const CLIENT_PREFIX: &str = "settings.client.";
const TOKEN_PREFIX: &str = "settings.token.";

pub const REQUIRE_PROOF_KEY: &str = "settings.client.require-proof-key";
pub const REQUIRE_AUTHORIZATION_CONSENT: &str = "settings.client.require-authorization-consent";
pub const JWK_SET_URL: &str = "settings.client.jwk-set-url";
pub const TOKEN_ENDPOINT_SIGNING_ALGORITHM: &str =
    "settings.client.token-endpoint-authentication-signing-algorithm";

pub const AUTHORIZATION_CODE_TIME_TO_LIVE: &str = "settings.token.authorization-code-time-to-live";
pub const ACCESS_TOKEN_TIME_TO_LIVE: &str = "settings.token.access-token-time-to-live";
pub const ACCESS_TOKEN_FORMAT: &str = "settings.token.access-token-format";
pub const DEVICE_CODE_TIME_TO_LIVE: &str = "settings.token.device-code-time-to-live";
pub const REUSE_REFRESH_TOKENS: &str = "settings.token.reuse-refresh-tokens";
pub const REFRESH_TOKEN_TIME_TO_LIVE: &str = "settings.token.refresh-token-time-to-live";
pub const ID_TOKEN_SIGNATURE_ALGORITHM: &str = "settings.token.id-token-signature-algorithm";

fn duration_setting(map: &AttributeMap, key: &str) -> Option<Duration> {
    map.get(key)
        .and_then(AttributeValue::as_i64)
        .and_then(|secs| u64::try_from(secs).ok())
        .map(Duration::from_secs)
}

/// Stores whole seconds. Sub-second parts are dropped and anything past
/// `i64::MAX` seconds saturates to it, which reads back as that maximum.
fn set_duration(map: &mut AttributeMap, key: &str, value: Duration) {
    let secs = i64::try_from(value.as_secs()).unwrap_or(i64::MAX);
    map.insert(key.to_string(), AttributeValue::Integer(secs));
}

// =============================================================================
// Client Settings
// =============================================================================

/// Per-client behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSettings(AttributeMap);

impl ClientSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(map: AttributeMap) -> Self {
        Self(map)
    }

    #[must_use]
    pub fn as_map(&self) -> &AttributeMap {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> AttributeMap {
        self.0
    }

    /// Returns a raw setting. Short keys are resolved under `settings.client.`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0
            .get(key)
            .or_else(|| self.0.get(&format!("{CLIENT_PREFIX}{key}")))
    }

    /// Sets a raw setting.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Whether PKCE is mandatory for this client. Defaults to `true`.
    #[must_use]
    pub fn require_proof_key(&self) -> bool {
        self.0
            .get(REQUIRE_PROOF_KEY)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(true)
    }

    /// Whether the consent page must be shown. Defaults to `false`.
    #[must_use]
    pub fn require_authorization_consent(&self) -> bool {
        self.0
            .get(REQUIRE_AUTHORIZATION_CONSENT)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn jwk_set_url(&self) -> Option<&str> {
        self.0.get(JWK_SET_URL).and_then(AttributeValue::as_str)
    }

    #[must_use]
    pub fn token_endpoint_signing_algorithm(&self) -> Option<&str> {
        self.0
            .get(TOKEN_ENDPOINT_SIGNING_ALGORITHM)
            .and_then(AttributeValue::as_str)
    }

    #[must_use]
    pub fn with_require_proof_key(self, value: bool) -> Self {
        self.with(REQUIRE_PROOF_KEY, value)
    }

    #[must_use]
    pub fn with_require_authorization_consent(self, value: bool) -> Self {
        self.with(REQUIRE_AUTHORIZATION_CONSENT, value)
    }
}

// =============================================================================
// Token Settings
// =============================================================================

/// Token lifetimes and formats for a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSettings(AttributeMap);

impl TokenSettings {
    pub const DEFAULT_AUTHORIZATION_CODE_TTL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_DEVICE_CODE_TTL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(map: AttributeMap) -> Self {
        Self(map)
    }

    #[must_use]
    pub fn as_map(&self) -> &AttributeMap {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> AttributeMap {
        self.0
    }

    /// Returns a raw setting. Short keys are resolved under `settings.token.`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0
            .get(key)
            .or_else(|| self.0.get(&format!("{TOKEN_PREFIX}{key}")))
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn authorization_code_ttl(&self) -> Duration {
        duration_setting(&self.0, AUTHORIZATION_CODE_TIME_TO_LIVE)
            .unwrap_or(Self::DEFAULT_AUTHORIZATION_CODE_TTL)
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        duration_setting(&self.0, ACCESS_TOKEN_TIME_TO_LIVE)
            .unwrap_or(Self::DEFAULT_ACCESS_TOKEN_TTL)
    }

    #[must_use]
    pub fn device_code_ttl(&self) -> Duration {
        duration_setting(&self.0, DEVICE_CODE_TIME_TO_LIVE).unwrap_or(Self::DEFAULT_DEVICE_CODE_TTL)
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        duration_setting(&self.0, REFRESH_TOKEN_TIME_TO_LIVE)
            .unwrap_or(Self::DEFAULT_REFRESH_TOKEN_TTL)
    }

    /// `self-contained` (JWT) or `reference` (opaque). Defaults to `self-contained`.
    #[must_use]
    pub fn access_token_format(&self) -> &str {
        self.0
            .get(ACCESS_TOKEN_FORMAT)
            .and_then(AttributeValue::as_str)
            .unwrap_or("self-contained")
    }

    /// Defaults to `true`.
    #[must_use]
    pub fn reuse_refresh_tokens(&self) -> bool {
        self.0
            .get(REUSE_REFRESH_TOKENS)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(true)
    }

    /// Defaults to `RS256`.
    #[must_use]
    pub fn id_token_signature_algorithm(&self) -> &str {
        self.0
            .get(ID_TOKEN_SIGNATURE_ALGORITHM)
            .and_then(AttributeValue::as_str)
            .unwrap_or("RS256")
    }

    /// Durations are kept in whole seconds, saturating at `i64::MAX`.
    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        set_duration(&mut self.0, ACCESS_TOKEN_TIME_TO_LIVE, ttl);
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        set_duration(&mut self.0, REFRESH_TOKEN_TIME_TO_LIVE, ttl);
        self
    }

    #[must_use]
    pub fn with_authorization_code_ttl(mut self, ttl: Duration) -> Self {
        set_duration(&mut self.0, AUTHORIZATION_CODE_TIME_TO_LIVE, ttl);
        self
    }

    #[must_use]
    pub fn with_reuse_refresh_tokens(self, value: bool) -> Self {
        self.with(REUSE_REFRESH_TOKENS, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_settings_defaults() {
        let settings = ClientSettings::new();
        assert!(settings.require_proof_key());
        assert!(!settings.require_authorization_consent());
        assert_eq!(settings.jwk_set_url(), None);
    }

    #[test]
    fn test_client_settings_short_key_lookup() {
        let settings = ClientSettings::new().with_require_authorization_consent(true);
        assert!(settings.require_authorization_consent());
        assert_eq!(
            settings.get("require-authorization-consent"),
            Some(&AttributeValue::Boolean(true))
        );
    }

    #[test]
    fn test_token_settings_durations() {
        let settings = TokenSettings::new()
            .with_access_token_ttl(Duration::from_secs(1800))
            .with_reuse_refresh_tokens(false);
        assert_eq!(settings.access_token_ttl(), Duration::from_secs(1800));
        assert_eq!(
            settings.refresh_token_ttl(),
            TokenSettings::DEFAULT_REFRESH_TOKEN_TTL
        );
        assert!(!settings.reuse_refresh_tokens());
        assert_eq!(settings.access_token_format(), "self-contained");
    }

    #[test]
    fn test_negative_duration_ignored() {
        let settings = TokenSettings::new().with(ACCESS_TOKEN_TIME_TO_LIVE, -5i64);
        assert_eq!(
            settings.access_token_ttl(),
            TokenSettings::DEFAULT_ACCESS_TOKEN_TTL
        );
    }

    #[test]
    fn test_duration_stored_in_saturated_whole_seconds() {
        let settings = TokenSettings::new()
            .with_access_token_ttl(Duration::MAX)
            .with_refresh_token_ttl(Duration::from_millis(90_500));
        assert_eq!(
            settings.get(ACCESS_TOKEN_TIME_TO_LIVE),
            Some(&AttributeValue::Integer(i64::MAX))
        );
        assert_eq!(
            settings.access_token_ttl(),
            Duration::from_secs(i64::MAX as u64)
        );
        assert_eq!(settings.refresh_token_ttl(), Duration::from_secs(90));
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let settings = TokenSettings::new().with("x-custom", "kept");
        assert_eq!(settings.get("x-custom").and_then(|v| v.as_str()), Some("kept"));
        assert_eq!(settings.as_map().len(), 1);
    }
}
