//! Firebase REST Adapters
//!
//! Identity and document storage on Firebase without the mobile SDKs:
//! plain HTTPS calls to the Identity Toolkit, Secure Token and
//! Firestore REST APIs.
//!
//! Sub-modules:
//! - `auth`: Email/password sign-in, token refresh, session persistence
//! - `client`: Shared HTTP client with concurrency limit and retries
//! - `firestore`: `DocumentStore` on Firestore documents and queries
//! - `types`: Wire types and Firestore value encoding

pub mod auth;
pub mod client;
pub mod firestore;
pub mod types;

pub use auth::FirebaseAuth;
pub use client::{FirebaseClient, FirebaseClientConfig};
pub use firestore::FirestoreStore;
