//! Application configuration for RosterSync.
//!
//! User config lives at `~/.rostersync/rostersync.toml`.
//! Secrets never live in the file; the `[secrets]` section names the
//! environment variables that hold them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterSyncError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rostersync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rostersync";

// ---------------------------------------------------------------------------
// Config structs (matching rostersync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Roster assembly settings.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Spreadsheet header → canonical field name mapping.
    ///
    /// Canonical fields: `name`, `committee`, `chair`, `ignore`, `image`,
    /// `github`, `linkedin`, `website`, `twitter`, `bluesky`, `mastodon`.
    /// Headers without an entry pass through unchanged. Note the `ignore`
    /// column: an affirmative value opts the row IN (historical name).
    #[serde(default)]
    pub columns: HashMap<String, String>,

    /// Target website repository settings.
    #[serde(default)]
    pub repo: RepoConfig,

    /// Environment variable names for secrets.
    #[serde(default)]
    pub secrets: SecretsConfig,
}

/// `[roster]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Committees emitted first, in this order. Unlisted committees follow
    /// in first-seen order.
    #[serde(default)]
    pub sort_order: Vec<String>,

    /// Committee assigned to members whose row leaves it blank.
    #[serde(default = "default_committee")]
    pub default_committee: String,

    /// Repository-relative directory that holds member images.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    /// File shown for members without a resolved image.
    #[serde(default = "default_image")]
    pub default_image: String,

    /// Repository-relative path of the databag JSON.
    #[serde(default = "default_databag_path")]
    pub databag_path: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            sort_order: Vec::new(),
            default_committee: default_committee(),
            image_dir: default_image_dir(),
            default_image: default_image(),
            databag_path: default_databag_path(),
        }
    }
}

fn default_committee() -> String {
    "other".into()
}
fn default_image_dir() -> String {
    "images/team".into()
}
fn default_image() -> String {
    "default.png".into()
}
fn default_databag_path() -> String {
    "databags/team.json".into()
}

/// `[repo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// HTTPS clone URL of the website repository.
    #[serde(default)]
    pub url: String,

    /// Branch the sync commits to and opens PRs from.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Branch pull requests target.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Repository owner (for the PR API).
    #[serde(default)]
    pub owner: String,

    /// Repository name (for the PR API).
    #[serde(default)]
    pub name: String,

    /// Local working directory the repository is cloned into.
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Reviewers requested on created pull requests. Best-effort.
    #[serde(default)]
    pub reviewers: Vec<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            branch: default_branch(),
            base_branch: default_base_branch(),
            owner: String::new(),
            name: String::new(),
            local_path: default_local_path(),
            reviewers: Vec::new(),
        }
    }
}

fn default_branch() -> String {
    "team-roster-update".into()
}
fn default_base_branch() -> String {
    "main".into()
}
fn default_local_path() -> String {
    "website".into()
}

/// `[secrets]` section — env var names, never the values themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Env var holding the spreadsheet identifier.
    #[serde(default = "default_sheet_id_env")]
    pub sheet_id_env: String,

    /// Env var holding the worksheet name.
    #[serde(default = "default_worksheet_env")]
    pub worksheet_env: String,

    /// Env var holding the Sheets API key.
    #[serde(default = "default_sheets_api_key_env")]
    pub sheets_api_key_env: String,

    /// Env var holding the token embedded in the clone URL.
    #[serde(default = "default_git_token_env")]
    pub git_token_env: String,

    /// Env var holding the bearer token for the PR API.
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            sheet_id_env: default_sheet_id_env(),
            worksheet_env: default_worksheet_env(),
            sheets_api_key_env: default_sheets_api_key_env(),
            git_token_env: default_git_token_env(),
            api_token_env: default_api_token_env(),
        }
    }
}

fn default_sheet_id_env() -> String {
    "TEAM_SHEET_ID".into()
}
fn default_worksheet_env() -> String {
    "TEAM_WORKSHEET_NAME".into()
}
fn default_sheets_api_key_env() -> String {
    "GSHEETS_API_KEY".into()
}
fn default_git_token_env() -> String {
    "WEBSITE_REPOSITORY_TOKEN".into()
}
fn default_api_token_env() -> String {
    "GITHUB_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Resolved secrets
// ---------------------------------------------------------------------------

/// Secret values resolved from the environment at startup.
#[derive(Clone)]
pub struct Secrets {
    pub sheet_id: String,
    pub worksheet: String,
    pub sheets_api_key: String,
    pub git_token: String,
    pub api_token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values are secrets; only the sheet coordinates are safe to show.
        f.debug_struct("Secrets")
            .field("sheet_id", &self.sheet_id)
            .field("worksheet", &self.worksheet)
            .finish_non_exhaustive()
    }
}

/// Resolve all secrets from the env var names in config.
///
/// Fails fast with a config error naming the first missing variable, before
/// any network call is made.
pub fn resolve_secrets(config: &SecretsConfig) -> Result<Secrets> {
    Ok(Secrets {
        sheet_id: require_env(&config.sheet_id_env)?,
        worksheet: require_env(&config.worksheet_env)?,
        sheets_api_key: require_env(&config.sheets_api_key_env)?,
        git_token: require_env(&config.git_token_env)?,
        api_token: require_env(&config.api_token_env)?,
    })
}

fn require_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(RosterSyncError::config(format!(
            "secret not found: set the {var_name} environment variable"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rostersync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RosterSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rostersync/rostersync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RosterSyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RosterSyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RosterSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RosterSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RosterSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("databag_path"));
        assert!(toml_str.contains("TEAM_SHEET_ID"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.roster.default_committee, "other");
        assert_eq!(parsed.repo.base_branch, "main");
        assert_eq!(parsed.secrets.api_token_env, "GITHUB_TOKEN");
    }

    #[test]
    fn config_with_columns_and_sort_order() {
        let toml_str = r#"
[roster]
sort_order = ["Board", "Volunteers"]

[columns]
"What is your name?" = "name"
"Which committee are you part of?" = "committee"

[repo]
url = "https://github.com/example/website.git"
owner = "example"
name = "website"
reviewers = ["alice"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.roster.sort_order, vec!["Board", "Volunteers"]);
        assert_eq!(
            config.columns.get("What is your name?").map(String::as_str),
            Some("name")
        );
        assert_eq!(config.repo.reviewers, vec!["alice"]);
        // Unspecified fields fall back to defaults
        assert_eq!(config.repo.branch, "team-roster-update");
        assert_eq!(config.roster.databag_path, "databags/team.json");
    }

    #[test]
    fn missing_secret_is_config_error() {
        let mut secrets = SecretsConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        secrets.sheet_id_env = "RS_TEST_NONEXISTENT_SHEET_ID_12345".into();
        let result = resolve_secrets(&secrets);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("RS_TEST_NONEXISTENT_SHEET_ID_12345")
        );
    }

    #[test]
    fn secrets_debug_hides_tokens() {
        let secrets = Secrets {
            sheet_id: "sheet".into(),
            worksheet: "ws".into(),
            sheets_api_key: "key-value".into(),
            git_token: "git-token-value".into(),
            api_token: "api-token-value".into(),
        };
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("git-token-value"));
        assert!(!rendered.contains("api-token-value"));
        assert!(!rendered.contains("key-value"));
    }
}
