//! Storage traits for authorization state.
//!
//! This module defines the interfaces consumed by the authorization server:
//!
//! - Registered client lookup and registration
//! - Authorization records and token lookup
//! - Consent decisions
//!
//! # Implementations
//!
//! - `authstore-memory` - in-process backend
//! - `authstore-postgres` - PostgreSQL backend

pub mod authorization;
pub mod client;
pub mod consent;

pub use authorization::AuthorizationService;
pub use client::RegisteredClientRepository;
pub use consent::AuthorizationConsentService;
