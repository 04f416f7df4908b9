//! # authstore-core
//!
//! Domain types and storage interfaces for an OAuth 2.0 authorization-state
//! store.
//!
//! This crate provides:
//! - Client registrations, authorization records and consent records
//! - The attribute codec used to flatten structured fields for storage
//! - Storage traits consumed by the authorization server
//! - The shared error type
//!
//! Backends live in separate crates (`authstore-memory`, `authstore-postgres`).
//!
//! ## Modules
//!
//! - [`types`] - Persisted domain types
//! - [`codec`] - Set and attribute-map encoding
//! - [`storage`] - Repository and service traits
//! - [`error`] - Error taxonomy

pub mod codec;
pub mod error;
pub mod storage;
pub mod types;

pub use codec::{AttributeMap, AttributeValue, CodecError};
pub use error::{ErrorCategory, StoreError, StoreResult};
pub use storage::{AuthorizationConsentService, AuthorizationService, RegisteredClientRepository};
pub use types::{
    AccessToken, AuthorizationGrantType, AuthorizationRecord, ClientAuthenticationMethod,
    ClientRegistration, ClientSettings, ConsentRecord, IdToken, Token, TokenKind, TokenSettings,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use authstore_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codec::{AttributeMap, AttributeValue, CodecError};
    pub use crate::error::{ErrorCategory, StoreError, StoreResult};
    pub use crate::storage::{
        AuthorizationConsentService, AuthorizationService, RegisteredClientRepository,
    };
    pub use crate::types::{
        AccessToken, AuthorizationGrantType, AuthorizationRecord, ClientAuthenticationMethod,
        ClientRegistration, ClientSettings, ConsentRecord, IdToken, Token, TokenKind,
        TokenSettings,
    };
}
