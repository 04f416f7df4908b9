//! In-memory backend for the authorization-state store.
//!
//! Implements the three storage traits from `authstore-core` without any
//! external dependency. State lives for the lifetime of the process, which
//! makes this backend suited for tests, development and single-node setups
//! where durability is not needed.
//!
//! # Example
//!
//! ```ignore
//! use authstore_core::prelude::*;
//! use authstore_memory::InMemoryAuthStore;
//!
//! let store = InMemoryAuthStore::new();
//! store.clients().save(&ClientRegistration::new("c1", "demo-client")).await?;
//! let found = store.clients().find_by_client_id("demo-client").await?;
//! ```

pub mod authorization;
pub mod client;
pub mod consent;

use std::sync::Arc;

pub use authorization::InMemoryAuthorizationService;
pub use client::InMemoryClientRepository;
pub use consent::{ConsentKey, InMemoryConsentService};

use authstore_core::{AuthorizationConsentService, AuthorizationService, RegisteredClientRepository};

/// All three in-memory stores behind shared handles.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthStore {
    clients: Arc<InMemoryClientRepository>,
    authorizations: Arc<InMemoryAuthorizationService>,
    consents: Arc<InMemoryConsentService>,
}

impl InMemoryAuthStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn clients(&self) -> Arc<InMemoryClientRepository> {
        Arc::clone(&self.clients)
    }

    #[must_use]
    pub fn authorizations(&self) -> Arc<InMemoryAuthorizationService> {
        Arc::clone(&self.authorizations)
    }

    #[must_use]
    pub fn consents(&self) -> Arc<InMemoryConsentService> {
        Arc::clone(&self.consents)
    }

    /// Client registry as a trait object.
    #[must_use]
    pub fn client_repository(&self) -> Arc<dyn RegisteredClientRepository> {
        self.clients()
    }

    /// Authorization service as a trait object.
    #[must_use]
    pub fn authorization_service(&self) -> Arc<dyn AuthorizationService> {
        self.authorizations()
    }

    /// Consent service as a trait object.
    #[must_use]
    pub fn consent_service(&self) -> Arc<dyn AuthorizationConsentService> {
        self.consents()
    }
}
