//! PersonLink core library.
//!
//! This crate links users who log in through an OpenID Connect provider to
//! the host's local records: configuration, store interfaces with in-memory
//! implementations, the directory snapshot file, and the identity operations
//! (person reconciliation and username resolution).

pub mod config;
pub mod directory;
pub mod errors;
pub mod identity;
pub mod models;
pub mod slug;
pub mod store;

// Re-exports for convenience.
pub use config::AppConfig;
pub use identity::{PersonReconciler, ReconcileOutcome, UsernameResolver};
pub use models::{Claims, Credential, Person, User};
