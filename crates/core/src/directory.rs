//! TOML-based directory snapshot reader/writer.
//!
//! The directory file holds the users and person records the in-memory stores
//! are seeded from. List order is significant: it is the listing order the
//! identity operations see.
//!
//! ```toml
//! [[users]]
//! id = "u1"
//! name = "alice"
//!
//! [[users.credentials]]
//! auth_provider = "openid"
//! data = { username = "alice", sub = "8c1e0d" }
//!
//! [[persons]]
//! id = "alice"
//! name = "Alice"
//! user_id = "u1"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::DirectoryError;
use crate::models::{Person, User};

/// Contents of a directory file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DirectoryData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub persons: Vec<Person>,
}

/// Utilities for loading and saving the directory file.
pub struct DirectoryFile;

impl DirectoryFile {
    /// Load the directory file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DirectoryData, DirectoryError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading directory file");

        if !path.exists() {
            return Err(DirectoryError::FileError {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let data: DirectoryData =
            toml::from_str(&contents).map_err(|e| DirectoryError::ParseError(e.to_string()))?;

        debug!(
            users = data.users.len(),
            persons = data.persons.len(),
            "loaded directory"
        );
        Ok(data)
    }

    /// Write the directory back to disk in TOML format.
    pub fn save<P: AsRef<Path>>(path: P, data: &DirectoryData) -> Result<(), DirectoryError> {
        let path = path.as_ref();
        info!(path = %path.display(), "saving directory file");

        let toml_str =
            toml::to_string_pretty(data).map_err(|e| DirectoryError::ParseError(e.to_string()))?;
        std::fs::write(path, toml_str)?;

        debug!(
            users = data.users.len(),
            persons = data.persons.len(),
            "saved directory"
        );
        Ok(())
    }
}
