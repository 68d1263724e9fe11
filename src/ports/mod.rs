//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `IdentityProvider`: Sign-in, sign-out and current session
//! - `DocumentStore`: Keyed writes, appends, reads and queries

pub mod document_store;
pub mod identity;
