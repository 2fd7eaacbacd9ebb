//! Person reconciliation for freshly logged-in users.
//!
//! [`PersonReconciler`] makes sure a user coming back from the identity
//! provider ends up linked to exactly one person record. Lookup order:
//! 1. A person already linked to the user (nothing to do)
//! 2. A person whose name matches the candidate name, or whose id is its slug
//!    (relink)
//! 3. A new person (create)

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{default_name_claims, ReconcileConfig};
use crate::errors::{IdentityError, StoreError};
use crate::models::{Claims, Person, PersonPatch, User};
use crate::slug::slugify;
use crate::store::PersonStore;

/// What a reconciliation run did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// No person store is configured; nothing was read or written.
    PersonStoreUnavailable,
    /// A person is already linked to the user.
    AlreadyLinked { person_id: String },
    /// An existing person matching the name was pointed at the user.
    Relinked {
        person_id: String,
        previous_user_id: Option<String>,
    },
    /// A new person was created for the user.
    Created { person_id: String, name: String },
    /// The store refused to create the person. The login proceeds anyway.
    CreateRejected { name: String, reason: String },
}

impl ReconcileOutcome {
    /// Whether the run wrote to the person store.
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Relinked { .. } | Self::Created { .. })
    }
}

/// Links users to person records.
pub struct PersonReconciler {
    persons: Option<Arc<dyn PersonStore>>,
    name_claims: Vec<String>,
}

impl PersonReconciler {
    /// Reconciler over `persons`, consulting the default name claims
    /// (`name`, `preferred_username`, `username`). Pass `None` when the host
    /// has no person collection.
    pub fn new(persons: Option<Arc<dyn PersonStore>>) -> Self {
        Self {
            persons,
            name_claims: default_name_claims(),
        }
    }

    /// Build from configuration. `link_persons = false` drops the store.
    pub fn from_config(config: &ReconcileConfig, persons: Option<Arc<dyn PersonStore>>) -> Self {
        let persons = if config.link_persons {
            persons
        } else {
            debug!("person linking disabled by configuration");
            None
        };
        Self {
            persons,
            name_claims: config.name_claims.clone(),
        }
    }

    /// Ensure a person record is linked to `user`.
    ///
    /// Only store failures other than a rejected creation are returned as
    /// errors; a rejected creation is logged and reported as
    /// [`ReconcileOutcome::CreateRejected`].
    pub async fn ensure_person_for_user(
        &self,
        user: &User,
        claims: &Claims,
    ) -> Result<ReconcileOutcome, IdentityError> {
        if user.id.is_empty() {
            return Err(IdentityError::EmptyUserId);
        }

        let Some(persons) = self.persons.as_ref() else {
            debug!(user_id = %user.id, "person store not available; skipping person creation");
            return Ok(ReconcileOutcome::PersonStoreUnavailable);
        };

        let items = persons.list_items().await?;

        if let Some(linked) = items.iter().find(|p| p.is_linked_to(&user.id)) {
            debug!(user_id = %user.id, person_id = %linked.id, "person already linked");
            return Ok(ReconcileOutcome::AlreadyLinked {
                person_id: linked.id.clone(),
            });
        }

        let candidate = self.candidate_name(user, claims);

        if let Some(candidate) = candidate {
            if let Some(existing) = find_match(&items, candidate) {
                if existing.is_linked_to(&user.id) {
                    return Ok(ReconcileOutcome::AlreadyLinked {
                        person_id: existing.id.clone(),
                    });
                }

                persons
                    .update_item(&existing.id, PersonPatch::link_user(&user.id))
                    .await?;
                info!(
                    user_id = %user.id,
                    person_id = %existing.id,
                    previous_user_id = ?existing.user_id,
                    "relinked existing person"
                );
                return Ok(ReconcileOutcome::Relinked {
                    person_id: existing.id.clone(),
                    previous_user_id: existing.user_id.clone(),
                });
            }
        }

        let name = candidate.unwrap_or(user.id.as_str());

        match persons.create_person(name, Some(&user.id)).await {
            Ok(person) => {
                info!(user_id = %user.id, person_id = %person.id, name, "created person");
                Ok(ReconcileOutcome::Created {
                    person_id: person.id,
                    name: person.name,
                })
            }
            Err(StoreError::Validation(reason)) => {
                warn!(user_id = %user.id, error = %reason, "unable to create person for user");
                Ok(ReconcileOutcome::CreateRejected {
                    name: name.to_string(),
                    reason,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// First non-empty configured claim, else the user's display name.
    fn candidate_name<'a>(&'a self, user: &'a User, claims: &'a Claims) -> Option<&'a str> {
        self.name_claims
            .iter()
            .find_map(|key| claims.non_empty_str(key))
            .or_else(|| user.name.as_deref().filter(|n| !n.is_empty()))
    }
}

/// First person, in store order, whose name equals `candidate` ignoring case
/// or whose id equals its slug.
fn find_match<'a>(items: &'a [Person], candidate: &str) -> Option<&'a Person> {
    let wanted = candidate.to_lowercase();
    let slug = slugify(candidate);

    items
        .iter()
        .find(|p| p.name.to_lowercase() == wanted || (!slug.is_empty() && p.id == slug))
}
