//! Error types for the PersonLink core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the auth and person store collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the write because the data is invalid, e.g. an
    /// empty person name or a user already linked to another person.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A record addressed by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// The store itself is broken (transport, lock poisoning, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Directory file errors
// ---------------------------------------------------------------------------

/// Errors from reading or writing the directory snapshot file.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory file is missing or unusable.
    #[error("directory file error at '{path}': {detail}")]
    FileError {
        path: String,
        detail: String,
    },

    /// TOML (de)serialization error.
    #[error("directory parse error: {0}")]
    ParseError(String),

    /// Generic I/O error.
    #[error("directory I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors from person reconciliation and username resolution.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The user handed to the reconciler has no id.
    #[error("user id must not be empty")]
    EmptyUserId,

    /// The username to resolve is empty.
    #[error("username must not be empty")]
    EmptyUsername,

    /// A store call failed in a way the caller has to deal with.
    #[error("identity store error: {0}")]
    Store(#[from] StoreError),
}
