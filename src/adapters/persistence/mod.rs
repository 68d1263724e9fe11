//! Persistence Adapters - Local File Storage
//!
//! Implements the DocumentStore port on the local filesystem: keyed
//! documents as atomic JSON files, appended documents as JSONL logs.
//! Also stores the identity provider session between runs.
//! Plain files, no database dependency.

pub mod keyed;
pub mod log;
pub mod session;
pub mod store_impl;

pub use keyed::KeyedFiles;
pub use log::AppendLog;
pub use session::SessionFile;
pub use store_impl::LocalDocumentStore;
