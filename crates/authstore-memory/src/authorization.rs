//! In-memory authorization records.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use authstore_core::codec::{ensure_encodable, ensure_instant_encodable};
use authstore_core::storage::AuthorizationService;
use authstore_core::types::{AuthorizationRecord, TokenKind};
use authstore_core::{StoreError, StoreResult};

type TokenKey = (TokenKind, String);

#[derive(Debug, Default)]
struct AuthorizationTable {
    records: HashMap<String, AuthorizationRecord>,
    /// Unique index: (kind, value) -> owning record id.
    tokens: HashMap<TokenKey, String>,
}

impl AuthorizationTable {
    fn unindex(tokens: &mut HashMap<TokenKey, String>, record: &AuthorizationRecord) {
        for (kind, value) in record.token_values() {
            tokens.remove(&(kind, value.to_string()));
        }
    }
}

/// Authorization store backed by hash maps.
///
/// Records and the token index share one lock; `save` checks every token
/// value and rewrites the index under a single write guard.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationService {
    table: RwLock<AuthorizationTable>,
}

impl InMemoryAuthorizationService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn ensure_record_encodable(record: &AuthorizationRecord) -> StoreResult<()> {
    ensure_encodable(&record.attributes)?;
    for kind in TokenKind::ALL {
        if let Some(token) = record.token(kind) {
            ensure_encodable(&token.metadata)?;
            for at in [token.issued_at, token.expires_at].into_iter().flatten() {
                ensure_instant_encodable(at)?;
            }
        }
    }
    if let Some(id_token) = &record.oidc_id_token {
        ensure_encodable(&id_token.claims)?;
    }
    Ok(())
}

#[async_trait]
impl AuthorizationService for InMemoryAuthorizationService {
    async fn save(&self, authorization: &AuthorizationRecord) -> StoreResult<()> {
        authorization
            .validate()
            .map_err(StoreError::invalid_input)?;
        ensure_record_encodable(authorization)?;

        let mut guard = self.table.write().await;
        let AuthorizationTable { records, tokens } = &mut *guard;

        for (kind, value) in authorization.token_values() {
            if let Some(owner) = tokens.get(&(kind, value.to_string()))
                && owner != &authorization.id
            {
                warn!(
                    id = %authorization.id,
                    token_kind = %kind,
                    "token value already held by another authorization"
                );
                return Err(StoreError::uniqueness("authorization", kind.as_str()));
            }
        }

        if let Some(previous) = records.get(&authorization.id) {
            AuthorizationTable::unindex(tokens, previous);
        }
        for (kind, value) in authorization.token_values() {
            tokens.insert((kind, value.to_string()), authorization.id.clone());
        }
        records.insert(authorization.id.clone(), authorization.clone());

        debug!(
            id = %authorization.id,
            registered_client_id = %authorization.registered_client_id,
            "Saved authorization"
        );
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<AuthorizationRecord>> {
        Ok(self.table.read().await.records.get(id).cloned())
    }

    async fn find_by_token(
        &self,
        value: &str,
        kind: Option<TokenKind>,
    ) -> StoreResult<Option<AuthorizationRecord>> {
        let table = self.table.read().await;
        let candidates = match kind {
            Some(kind) => vec![kind],
            None => TokenKind::LOOKUP_ORDER.to_vec(),
        };

        let found = candidates
            .into_iter()
            .find_map(|kind| table.tokens.get(&(kind, value.to_string())))
            .and_then(|id| table.records.get(id))
            .cloned();
        Ok(found)
    }

    async fn remove_by_id(&self, id: &str) -> StoreResult<()> {
        let mut guard = self.table.write().await;
        let AuthorizationTable { records, tokens } = &mut *guard;

        if let Some(removed) = records.remove(id) {
            AuthorizationTable::unindex(tokens, &removed);
            debug!(id, "Removed authorization");
        }
        Ok(())
    }

    async fn remove_expired(&self, now: OffsetDateTime) -> StoreResult<u64> {
        let mut guard = self.table.write().await;
        let AuthorizationTable { records, tokens } = &mut *guard;

        let expired: Vec<String> = records
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.id.clone())
            .collect();

        for id in &expired {
            if let Some(removed) = records.remove(id) {
                AuthorizationTable::unindex(tokens, &removed);
            }
        }

        let count = expired.len() as u64;
        if count > 0 {
            info!(count, "Removed expired authorizations");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use authstore_core::types::{AccessToken, AuthorizationGrantType, Token};
    use time::macros::datetime;

    fn record(id: &str) -> AuthorizationRecord {
        AuthorizationRecord::new(id, "c1", "alice", AuthorizationGrantType::AuthorizationCode)
    }

    fn bearer(value: &str) -> AccessToken {
        AccessToken::bearer(Token::new(value), BTreeSet::from(["read".to_string()]))
    }

    #[tokio::test]
    async fn test_find_by_access_token() {
        let service = InMemoryAuthorizationService::new();
        let a = record("a1").with_access_token(bearer("tok-123"));
        service.save(&a).await.unwrap();

        assert_eq!(service.find_by_token("tok-123", None).await.unwrap(), Some(a.clone()));
        assert_eq!(
            service
                .find_by_token("tok-123", Some(TokenKind::AccessToken))
                .await
                .unwrap(),
            Some(a)
        );
    }

    #[tokio::test]
    async fn test_wrong_hint_is_not_found() {
        let service = InMemoryAuthorizationService::new();
        service
            .save(&record("a1").with_access_token(bearer("tok-123")))
            .await
            .unwrap();

        assert_eq!(
            service
                .find_by_token("tok-123", Some(TokenKind::RefreshToken))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_unhinted_lookup_follows_priority() {
        let service = InMemoryAuthorizationService::new();
        // same value under two kinds in two different records
        service
            .save(&record("a-refresh").with_refresh_token(Token::new("shared")))
            .await
            .unwrap();
        service
            .save(&record("a-state").with_state("shared"))
            .await
            .unwrap();

        let found = service.find_by_token("shared", None).await.unwrap().unwrap();
        assert_eq!(found.id, "a-state");
    }

    #[tokio::test]
    async fn test_id_token_requires_hint() {
        let service = InMemoryAuthorizationService::new();
        let a = record("a1").with_id_token(authstore_core::types::IdToken {
            token: Token::new("idt"),
            claims: Default::default(),
        });
        service.save(&a).await.unwrap();

        assert_eq!(service.find_by_token("idt", None).await.unwrap(), None);
        assert_eq!(
            service
                .find_by_token("idt", Some(TokenKind::IdToken))
                .await
                .unwrap()
                .map(|r| r.id),
            Some("a1".to_string())
        );
    }

    #[tokio::test]
    async fn test_colliding_access_token_rejected() {
        let service = InMemoryAuthorizationService::new();
        service
            .save(&record("a1").with_access_token(bearer("tok-123")))
            .await
            .unwrap();

        let err = service
            .save(&record("a2").with_access_token(bearer("tok-123")))
            .await
            .unwrap_err();
        assert!(err.is_uniqueness_violation());
        assert_eq!(service.find_by_id("a2").await.unwrap(), None);
        assert_eq!(
            service.find_by_token("tok-123", None).await.unwrap().unwrap().id,
            "a1"
        );
    }

    #[tokio::test]
    async fn test_resave_same_record_keeps_own_tokens() {
        let service = InMemoryAuthorizationService::new();
        let a = record("a1").with_authorization_code(Token::new("code-1"));
        service.save(&a).await.unwrap();

        let a = a
            .with_access_token(bearer("tok-1"))
            .with_refresh_token(Token::new("ref-1"));
        service.save(&a).await.unwrap();

        for value in ["code-1", "tok-1", "ref-1"] {
            assert_eq!(
                service.find_by_token(value, None).await.unwrap().map(|r| r.id),
                Some("a1".to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_token_replacement_releases_old_value() {
        let service = InMemoryAuthorizationService::new();
        let a = record("a1").with_state("state-1");
        service.save(&a).await.unwrap();

        let mut issued = a;
        issued.state = None;
        let issued = issued.with_authorization_code(Token::new("code-1"));
        service.save(&issued).await.unwrap();

        assert_eq!(service.find_by_token("state-1", None).await.unwrap(), None);
        service.save(&record("a2").with_state("state-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let service = InMemoryAuthorizationService::new();
        let a = record("a1").with_access_token(bearer("tok-123"));
        service.save(&a).await.unwrap();

        service.remove(&a).await.unwrap();
        service.remove(&a).await.unwrap();
        service.remove_by_id("missing").await.unwrap();
        assert!(service.is_empty().await);
        assert_eq!(service.find_by_token("tok-123", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let service = InMemoryAuthorizationService::new();
        let now = datetime!(2024-05-01 12:00 UTC);
        let expired = Token::issued(
            "old-code",
            datetime!(2024-05-01 10:00 UTC),
            datetime!(2024-05-01 10:05 UTC),
        );
        let live = Token::issued(
            "live-code",
            datetime!(2024-05-01 11:59 UTC),
            datetime!(2024-05-01 12:04 UTC),
        );
        service
            .save(&record("a-old").with_authorization_code(expired))
            .await
            .unwrap();
        service
            .save(&record("a-live").with_authorization_code(live))
            .await
            .unwrap();
        service
            .save(&record("a-pending").with_state("st"))
            .await
            .unwrap();

        assert_eq!(service.remove_expired(now).await.unwrap(), 1);
        assert_eq!(service.len().await, 2);
        assert_eq!(service.find_by_token("old-code", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unencodable_metadata_rejected() {
        let service = InMemoryAuthorizationService::new();
        let mut token = Token::new("tok");
        token.metadata.insert("score".into(), f64::NAN.into());
        let err = service
            .save(&record("a1").with_refresh_token(token))
            .await
            .unwrap_err();
        assert!(err.is_codec_error());
        assert!(service.is_empty().await);
    }
}
