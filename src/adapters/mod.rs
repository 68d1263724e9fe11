//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (Firebase REST APIs, file I/O, stdin/stdout).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `firebase`: Identity Toolkit sign-in and Cloud Firestore documents
//! - `local`: Config-defined accounts for offline use
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSON/JSONL document files and the saved session
//! - `terminal`: Line-oriented front-end driving the use cases

pub mod firebase;
pub mod local;
pub mod metrics;
pub mod persistence;
pub mod terminal;
