//! TOML-based configuration system for PersonLink.
//!
//! The directory path may be overridden at runtime from an environment
//! variable named by `directory.path_env`, resolved via
//! [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where users and person records are read from.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Person reconciliation behaviour.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Location of the directory snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Path to the TOML directory file (default `./directory.toml`).
    #[serde(default = "default_directory_path")]
    pub path: PathBuf,

    /// Environment variable that, when set, overrides `path`.
    #[serde(default)]
    pub path_env: Option<String>,
}

fn default_directory_path() -> PathBuf {
    PathBuf::from("./directory.toml")
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            path: default_directory_path(),
            path_env: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Person reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Whether person records are maintained at all. When false the
    /// reconciler runs without a person store and never writes.
    #[serde(default = "default_true")]
    pub link_persons: bool,

    /// Claims consulted, in order, for a person name.
    #[serde(default = "default_name_claims")]
    pub name_claims: Vec<String>,
}

fn default_true() -> bool {
    true
}

pub fn default_name_claims() -> Vec<String> {
    vec![
        "name".into(),
        "preferred_username".into(),
        "username".into(),
    ]
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            link_persons: true,
            name_claims: default_name_claims(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Apply environment overrides. A missing variable logs a warning and
    /// keeps the configured value.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.directory.path_env {
            if let Some(path) = resolve_optional_env(env_name, "directory.path_env") {
                self.directory.path = PathBuf::from(path);
            }
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_level".into(),
                detail: format!("expected one of {}", LOG_LEVELS.join(", ")),
            });
        }
        if self.directory.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "directory.path".into(),
                detail: "directory path must not be empty".into(),
            });
        }
        if self.reconcile.name_claims.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "reconcile.name_claims".into(),
                detail: "at least one name claim is required".into(),
            });
        }
        if self.reconcile.name_claims.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "reconcile.name_claims".into(),
                detail: "claim keys must not be blank".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[logging]
log_level = "debug"

[directory]
path = "/var/lib/personlink/directory.toml"
path_env = "PERSONLINK_DIRECTORY"

[reconcile]
link_persons = false
name_claims = ["preferred_username", "name"]
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(
            config.directory.path,
            PathBuf::from("/var/lib/personlink/directory.toml")
        );
        assert!(!config.reconcile.link_persons);
        assert_eq!(config.reconcile.name_claims, vec!["preferred_username", "name"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.log_level, "warn");
        assert_eq!(config.directory.path, PathBuf::from("./directory.toml"));
        assert!(config.reconcile.link_persons);
        assert_eq!(
            config.reconcile.name_claims,
            vec!["name", "preferred_username", "username"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_claims() {
        let mut config = AppConfig::default();
        config.reconcile.name_claims.clear();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "reconcile.name_claims"
        ));

        config.reconcile.name_claims = vec!["name".into(), " ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = AppConfig::default();
        config.logging.log_level = "verbose".into();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.log_level"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_PERSONLINK_DIR", "/tmp/override.toml");

        let mut config: AppConfig = toml::from_str(
            r#"
[directory]
path_env = "TEST_PERSONLINK_DIR"
"#,
        )
        .unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.directory.path, PathBuf::from("/tmp/override.toml"));

        std::env::remove_var("TEST_PERSONLINK_DIR");
    }

    #[test]
    fn test_resolve_missing_env_keeps_path() {
        let mut config: AppConfig = toml::from_str(
            r#"
[directory]
path = "/srv/directory.toml"
path_env = "TEST_PERSONLINK_DIR_UNSET"
"#,
        )
        .unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.directory.path, PathBuf::from("/srv/directory.toml"));
    }
}
