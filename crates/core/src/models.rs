//! Domain model types used throughout PersonLink.
//!
//! These types bridge the store traits, the directory file, and the identity
//! operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Users & credentials
// ---------------------------------------------------------------------------

/// A local login account, owned by the auth store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<Credential>,
}

impl User {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            credentials: Vec::new(),
        }
    }

    /// Builder-style helper to attach a credential.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }
}

/// One authentication method attached to a [`User`], carrying the claims the
/// provider stored for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    #[serde(default = "default_provider")]
    pub auth_provider: String,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

fn default_provider() -> String {
    "openid".into()
}

impl Credential {
    pub fn new(auth_provider: impl Into<String>) -> Self {
        Self {
            auth_provider: auth_provider.into(),
            data: HashMap::new(),
        }
    }

    /// Credential whose only stored claim is `username`.
    pub fn with_username(auth_provider: impl Into<String>, username: &str) -> Self {
        let mut credential = Self::new(auth_provider);
        credential
            .data
            .insert("username".into(), Value::String(username.to_string()));
        credential
    }

    /// The stored `username` claim, if it is a string.
    pub fn username(&self) -> Option<&str> {
        self.data.get("username").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Persons
// ---------------------------------------------------------------------------

/// A household member record, owned by the person store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>, user_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            user_id: user_id.map(str::to_string),
        }
    }

    /// Whether this person is linked to the given user.
    pub fn is_linked_to(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Partial update for a [`Person`]. `None` fields are left unchanged;
/// `user_id: Some(None)` clears the link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Option<String>>,
}

impl PersonPatch {
    /// Patch that links the person to `user_id`.
    pub fn link_user(user_id: &str) -> Self {
        Self {
            name: None,
            user_id: Some(Some(user_id.to_string())),
        }
    }

    /// Apply the patch to a person in place.
    pub fn apply(&self, person: &mut Person) {
        if let Some(ref name) = self.name {
            person.name = name.clone();
        }
        if let Some(ref user_id) = self.user_id {
            person.user_id = user_id.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Claims returned by the identity provider for a single login.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Claims(HashMap<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The claim as a string, skipping missing, non-string and empty values.
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Claims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
