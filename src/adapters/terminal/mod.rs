//! Terminal Adapter - Text Front-end
//!
//! Drives the session, conversion and navigation use cases from a
//! line-oriented reader/writer pair (stdin/stdout in the binary).

pub mod app;

pub use app::TerminalApp;
