//! PersonLink command-line tool.
//!
//! Runs the login-time identity operations against a directory file:
//! reconciling a user's person record from provider claims, resolving a
//! username to a local user, and inspecting person records. Also generates
//! and validates configuration files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use personlink_core::config::AppConfig;
use personlink_core::directory::{DirectoryData, DirectoryFile};
use personlink_core::identity::{PersonReconciler, ReconcileOutcome, UsernameResolver};
use personlink_core::models::{Claims, User};
use personlink_core::store::{AuthStore, MemoryAuthStore, MemoryPersonStore, PersonStore};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// PersonLink command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "personlink",
    version,
    about = "Link OpenID Connect logins to local users and person records"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./personlink.toml")]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ensure a person record is linked to a user.
    Reconcile {
        /// Id of the user that just logged in.
        #[arg(short, long)]
        user: String,

        /// Provider claim as key=value (repeatable).
        #[arg(long = "claim", value_parser = parse_claim)]
        claims: Vec<(String, String)>,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Find the local user matching a username.
    Resolve {
        /// Username to look up (case-insensitive).
        username: String,

        /// Print the user as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List person records.
    Persons,

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./personlink.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(&output)
        }
        Commands::Validate => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_validate(&cli.config)
        }
        command => {
            let config = load_config(&cli.config)?;
            init_tracing(
                cli.log_level
                    .as_deref()
                    .unwrap_or(&config.logging.log_level),
            );
            let directory = load_directory(&config)?;

            match command {
                Commands::Reconcile { user, claims, json } => {
                    cmd_reconcile(&config, directory, &user, claims, json).await
                }
                Commands::Resolve { username, json } => {
                    cmd_resolve(directory, &username, json).await
                }
                Commands::Persons => cmd_persons(&directory),
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration file")
}

fn load_directory(config: &AppConfig) -> Result<DirectoryData> {
    DirectoryFile::load(&config.directory.path).with_context(|| {
        format!(
            "failed to load directory file {}",
            config.directory.path.display()
        )
    })
}

/// Parse a `key=value` claim argument.
fn parse_claim(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid claim '{raw}': expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid claim '{raw}': key must not be empty"));
    }
    Ok((key.to_string(), value.to_string()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_reconcile(
    config: &AppConfig,
    directory: DirectoryData,
    user_id: &str,
    claims: Vec<(String, String)>,
    json: bool,
) -> Result<()> {
    let user: User = directory
        .users
        .iter()
        .find(|u| u.id == user_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("user '{}' not found in directory", user_id))?;
    let claims: Claims = claims.into_iter().collect();

    let persons = Arc::new(MemoryPersonStore::new(directory.persons));
    let reconciler = PersonReconciler::from_config(
        &config.reconcile,
        Some(persons.clone() as Arc<dyn PersonStore>),
    );

    let outcome = reconciler
        .ensure_person_for_user(&user, &claims)
        .await
        .context("person reconciliation failed")?;

    if outcome.wrote() {
        let updated = DirectoryData {
            users: directory.users,
            persons: persons.snapshot().context("failed to read person store")?,
        };
        DirectoryFile::save(&config.directory.path, &updated)
            .context("failed to save directory file")?;
        debug!(path = %config.directory.path.display(), "directory updated");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        ReconcileOutcome::PersonStoreUnavailable => {
            println!("Person linking is disabled; nothing to do.");
        }
        ReconcileOutcome::AlreadyLinked { person_id } => {
            println!("User {} is already linked to person '{}'.", user.id, person_id);
        }
        ReconcileOutcome::Relinked {
            person_id,
            previous_user_id,
        } => {
            println!(
                "Relinked person '{}' to user {} (was {}).",
                person_id,
                user.id,
                previous_user_id.as_deref().unwrap_or("unlinked")
            );
        }
        ReconcileOutcome::Created { person_id, name } => {
            println!("Created person '{}' ({}) for user {}.", person_id, name, user.id);
        }
        ReconcileOutcome::CreateRejected { name, reason } => {
            println!("Could not create person '{}': {}", name, reason);
        }
    }

    Ok(())
}

async fn cmd_resolve(directory: DirectoryData, username: &str, json: bool) -> Result<()> {
    print!("{}", render_resolve(directory, username, json).await?);
    Ok(())
}

async fn render_resolve(directory: DirectoryData, username: &str, json: bool) -> Result<String> {
    let auth = Arc::new(MemoryAuthStore::new(directory.users));
    let resolver = UsernameResolver::new(auth as Arc<dyn AuthStore>);

    let found = resolver
        .find_user_by_username(username)
        .await
        .context("username resolution failed")?;

    let mut out = String::new();
    match (found, json) {
        (Some(user), true) => writeln!(out, "{}", serde_json::to_string_pretty(&user)?)?,
        (None, true) => writeln!(out, "null")?,
        (Some(user), false) => {
            writeln!(out, "Username : {}", username)?;
            writeln!(out, "User id  : {}", user.id)?;
            writeln!(out, "Name     : {}", user.name.as_deref().unwrap_or("-"))?;
            writeln!(out, "Providers: {}", provider_list(&user))?;
        }
        (None, false) => writeln!(out, "No user matches '{}'.", username)?,
    }

    Ok(out)
}

fn cmd_persons(directory: &DirectoryData) -> Result<()> {
    print!("{}", render_persons(directory)?);
    Ok(())
}

fn render_persons(directory: &DirectoryData) -> Result<String> {
    let mut out = String::new();
    if directory.persons.is_empty() {
        writeln!(out, "No person records found.")?;
        return Ok(out);
    }

    writeln!(out, "{:<24} {:<30} {:<24}", "ID", "NAME", "USER")?;
    writeln!(out, "{}", "-".repeat(80))?;

    for person in &directory.persons {
        writeln!(
            out,
            "{:<24} {:<30} {:<24}",
            truncate(&person.id, 24),
            truncate(&person.name, 30),
            person.user_id.as_deref().unwrap_or("-"),
        )?;
    }

    writeln!(out)?;
    writeln!(out, "{} person(s) shown", directory.persons.len())?;

    Ok(out)
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# PersonLink Configuration

[logging]
log_level = "warn"

[directory]
path = "./directory.toml"
# path_env = "PERSONLINK_DIRECTORY"

[reconcile]
link_persons = true
name_claims = ["name", "preferred_username", "username"]
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Point [directory] path at your users/persons file");
    println!(
        "  2. Validate with: personlink validate --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Log level     : {}", config.logging.log_level);
    println!("  Directory     : {}", config.directory.path.display());
    println!(
        "  Person linking: {}",
        if config.reconcile.link_persons {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("  Name claims   : {}", config.reconcile.name_claims.join(", "));
    println!();
    println!("Configuration is valid.");

    Ok(())
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn provider_list(user: &User) -> String {
    if user.credentials.is_empty() {
        return "-".to_string();
    }
    user.credentials
        .iter()
        .map(|c| c.auth_provider.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personlink_core::models::{Credential, Person};

    #[test]
    fn test_parse_claim() {
        assert_eq!(
            parse_claim("preferred_username=Alice").unwrap(),
            ("preferred_username".to_string(), "Alice".to_string())
        );
        assert_eq!(
            parse_claim("name=A=B").unwrap(),
            ("name".to_string(), "A=B".to_string())
        );
        assert_eq!(parse_claim("name=").unwrap().1, "");
        assert!(parse_claim("novalue").is_err());
        assert!(parse_claim("=x").is_err());
    }

    #[test]
    fn test_cli_parses_reconcile() {
        let cli = Cli::try_parse_from([
            "personlink",
            "reconcile",
            "--user",
            "u1",
            "--claim",
            "name=Alice",
            "--claim",
            "username=alice",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Reconcile { user, claims, json } => {
                assert_eq!(user, "u1");
                assert_eq!(claims.len(), 2);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-person-id", 10), "a-very-...");
    }

    #[tokio::test]
    async fn test_reconcile_saves_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.toml");
        let directory = DirectoryData {
            users: vec![User::new("u2", Some("Bob"))],
            persons: vec![Person::new("bob", "Bob", Some("u9"))],
        };
        DirectoryFile::save(&path, &directory).unwrap();

        let mut config = AppConfig::default();
        config.directory.path = path.clone();

        cmd_reconcile(&config, directory, "u2", Vec::new(), true)
            .await
            .unwrap();

        let saved = DirectoryFile::load(&path).unwrap();
        assert!(saved.persons[0].is_linked_to("u2"));
    }

    #[tokio::test]
    async fn test_reconcile_unknown_user() {
        let config = AppConfig::default();
        let result = cmd_reconcile(&config, DirectoryData::default(), "ghost", Vec::new(), false)
            .await;
        assert!(result.is_err());
    }

    fn sample_directory() -> DirectoryData {
        DirectoryData {
            users: vec![
                User::new("u1", Some("Owner")),
                User::new("u2", None)
                    .with_credential(Credential::with_username("openid", "Alice")),
            ],
            persons: vec![
                Person::new("owner", "Owner", Some("u1")),
                Person::new("guest", "Guest", None),
            ],
        }
    }

    #[tokio::test]
    async fn test_resolve_from_saved_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.toml");
        DirectoryFile::save(&path, &sample_directory()).unwrap();

        let directory = DirectoryFile::load(&path).unwrap();
        let text = render_resolve(directory, "ALICE", false).await.unwrap();
        assert!(text.contains("User id  : u2"));
        assert!(text.contains("Name     : -"));
        assert!(text.contains("Providers: openid"));

        let directory = DirectoryFile::load(&path).unwrap();
        let json = render_resolve(directory, "owner", true).await.unwrap();
        let user: User = serde_json::from_str(&json).unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_resolve_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.toml");
        DirectoryFile::save(&path, &sample_directory()).unwrap();

        let directory = DirectoryFile::load(&path).unwrap();
        let json = render_resolve(directory, "mallory", true).await.unwrap();
        assert_eq!(json.trim(), "null");

        let directory = DirectoryFile::load(&path).unwrap();
        let text = render_resolve(directory, "mallory", false).await.unwrap();
        assert_eq!(text.trim(), "No user matches 'mallory'.");
    }

    #[tokio::test]
    async fn test_resolve_empty_username_fails() {
        let result = render_resolve(sample_directory(), "", true).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_persons_listing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.toml");
        DirectoryFile::save(&path, &sample_directory()).unwrap();

        let text = render_persons(&DirectoryFile::load(&path).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].starts_with("owner") && lines[2].contains("u1"));
        assert!(lines[3].starts_with("guest") && lines[3].trim_end().ends_with('-'));
        assert!(text.contains("2 person(s) shown"));

        let empty = render_persons(&DirectoryData::default()).unwrap();
        assert_eq!(empty.trim(), "No person records found.");
    }
}
