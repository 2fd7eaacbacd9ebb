//! Store collaborators consumed by the identity operations.
//!
//! The host owns users, credentials, and person records; PersonLink only
//! talks to them through [`AuthStore`] and [`PersonStore`]. Reference
//! in-memory implementations live in [`memory`].

pub mod memory;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{Person, PersonPatch, User};

pub use memory::{MemoryAuthStore, MemoryPersonStore};

/// Read access to the host's login accounts.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// All users in the store's listing order, credentials included.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// The host's person collection.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// All person records in the store's iteration order.
    async fn list_items(&self) -> Result<Vec<Person>, StoreError>;

    /// Apply `patch` to the person with `id` and return the updated record.
    async fn update_item(&self, id: &str, patch: PersonPatch) -> Result<Person, StoreError>;

    /// Create a person. Fails with [`StoreError::Validation`] when the store
    /// rejects the name or the user link.
    async fn create_person(&self, name: &str, user_id: Option<&str>)
        -> Result<Person, StoreError>;
}
