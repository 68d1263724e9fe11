//! Local Adapters - Offline Identity
//!
//! Accounts declared in `config.toml` stand in for the remote identity
//! provider, so the converter runs without network access and tests
//! can sign in deterministically.

pub mod accounts;

pub use accounts::LocalAccounts;
