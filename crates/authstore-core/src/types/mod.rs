//! Domain types persisted by the store.

pub mod authorization;
pub mod client;
pub mod consent;
pub mod settings;

pub use authorization::{
    AccessToken, AuthorizationRecord, INVALIDATED_METADATA_KEY, IdToken, Token, TokenKind,
    UnknownTokenKind,
};
pub use client::{AuthorizationGrantType, ClientAuthenticationMethod, ClientRegistration};
pub use consent::{ConsentRecord, SCOPE_AUTHORITY_PREFIX};
pub use settings::{ClientSettings, TokenSettings};
