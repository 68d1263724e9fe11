//! Use Cases Layer - Application Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! converter's workflows. Each use case is a self-contained operation
//! that front-ends call without touching adapters directly.
//!
//! Use cases:
//! - `SessionManager`: Sign-in, sign-out and attempt throttling
//! - `ConversionService`: Convert amounts, save and list history
//! - `RateCatalog`: Publish and read the rates collection
//! - `Navigator`: Screen back stack and drawer menu

pub mod conversion;
pub mod navigation;
pub mod rate_catalog;
pub mod session;

pub use conversion::{ConversionOutcome, ConversionService, SaveStatus};
pub use navigation::{MenuAction, Navigator, PopUpTo, Route};
pub use rate_catalog::RateCatalog;
pub use session::{SessionError, SessionManager};
