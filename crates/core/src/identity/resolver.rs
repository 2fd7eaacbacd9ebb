//! Username resolution against the auth store.

use std::sync::Arc;

use tracing::debug;

use crate::errors::IdentityError;
use crate::models::User;
use crate::store::AuthStore;

/// Finds an existing local user for a username, ignoring case.
pub struct UsernameResolver {
    auth: Arc<dyn AuthStore>,
}

impl UsernameResolver {
    pub fn new(auth: Arc<dyn AuthStore>) -> Self {
        Self { auth }
    }

    /// Return the first user, in the auth store's listing order, whose
    /// display name or any credential `username` equals `username` ignoring
    /// case. `Ok(None)` means no user matched.
    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, IdentityError> {
        if username.is_empty() {
            return Err(IdentityError::EmptyUsername);
        }

        let wanted = username.to_lowercase();
        let users = self.auth.list_users().await?;

        for candidate in users {
            let name_matches = candidate
                .name
                .as_deref()
                .is_some_and(|name| !name.is_empty() && name.to_lowercase() == wanted);
            if name_matches {
                debug!(username, user_id = %candidate.id, "matched user by name");
                return Ok(Some(candidate));
            }

            let credential_matches = candidate
                .credentials
                .iter()
                .filter_map(|c| c.username())
                .any(|stored| stored.to_lowercase() == wanted);
            if credential_matches {
                debug!(username, user_id = %candidate.id, "matched user by credential");
                return Ok(Some(candidate));
            }
        }

        debug!(username, "no user matches username");
        Ok(None)
    }
}
