//! In-memory store implementations.
//!
//! Records are kept in insertion order behind an `RwLock`, so listing order
//! is stable and matches the directory file they were loaded from.

use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{AuthStore, PersonStore};
use crate::errors::StoreError;
use crate::models::{Person, PersonPatch, User};
use crate::slug::slugify;

fn poisoned(what: &str) -> StoreError {
    StoreError::Backend(format!("{what} lock poisoned"))
}

// ---------------------------------------------------------------------------
// Auth store
// ---------------------------------------------------------------------------

/// Auth store backed by a fixed list of users.
#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    users: RwLock<Vec<User>>,
}

impl MemoryAuthStore {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    /// Append a user at the end of the listing order.
    pub fn add_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned("user"))?;
        users.push(user);
        Ok(())
    }

    /// Copy of the current user list.
    pub fn snapshot(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned("user"))?;
        Ok(users.clone())
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.snapshot()
    }
}

// ---------------------------------------------------------------------------
// Person store
// ---------------------------------------------------------------------------

/// Person collection backed by an ordered list.
///
/// Mirrors the validation a real person collection applies: names must be
/// non-empty, a user may be linked to at most one person, and ids are
/// unique slugs of the name.
#[derive(Debug, Default)]
pub struct MemoryPersonStore {
    persons: RwLock<Vec<Person>>,
}

impl MemoryPersonStore {
    pub fn new(persons: Vec<Person>) -> Self {
        Self {
            persons: RwLock::new(persons),
        }
    }

    /// Copy of the current person list.
    pub fn snapshot(&self) -> Result<Vec<Person>, StoreError> {
        let persons = self.persons.read().map_err(|_| poisoned("person"))?;
        Ok(persons.clone())
    }
}

/// Pick an id for `name` that does not collide with any existing person:
/// the slug itself, then `slug_2`, `slug_3`, ...
fn unique_id(persons: &[Person], name: &str) -> String {
    let base = slugify(name);
    let taken = |candidate: &str| persons.iter().any(|p| p.id == candidate);

    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn check_user_free(
    persons: &[Person],
    user_id: &str,
    except: Option<&str>,
) -> Result<(), StoreError> {
    let taken = persons
        .iter()
        .filter(|p| Some(p.id.as_str()) != except)
        .any(|p| p.is_linked_to(user_id));
    if taken {
        return Err(StoreError::Validation(format!(
            "user {user_id} is already linked to another person"
        )));
    }
    Ok(())
}

#[async_trait]
impl PersonStore for MemoryPersonStore {
    async fn list_items(&self) -> Result<Vec<Person>, StoreError> {
        self.snapshot()
    }

    async fn update_item(&self, id: &str, patch: PersonPatch) -> Result<Person, StoreError> {
        let mut persons = self.persons.write().map_err(|_| poisoned("person"))?;

        if let Some(Some(ref user_id)) = patch.user_id {
            check_user_free(&persons, user_id, Some(id))?;
        }
        if matches!(patch.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(StoreError::Validation("person name must not be empty".into()));
        }

        let person = persons
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "person".into(),
                id: id.to_string(),
            })?;

        patch.apply(person);
        debug!(person_id = %person.id, user_id = ?person.user_id, "updated person");
        Ok(person.clone())
    }

    async fn create_person(
        &self,
        name: &str,
        user_id: Option<&str>,
    ) -> Result<Person, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("person name must not be empty".into()));
        }

        let mut persons = self.persons.write().map_err(|_| poisoned("person"))?;
        if let Some(user_id) = user_id {
            check_user_free(&persons, user_id, None)?;
        }

        let person = Person::new(unique_id(&persons, name), name, user_id);
        info!(person_id = %person.id, name, user_id = ?user_id, "created person");
        persons.push(person.clone());
        Ok(person)
    }
}
